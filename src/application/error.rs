//! 应用层错误定义
//!
//! 对话流水线与音色命令的错误类型

use thiserror::Error;

use crate::application::ports::{
    AgentError, CodecError, StoreError, SynthesisError, TranscribeError,
};
use crate::domain::conversation::MemoryError;

/// 对话流水线错误
///
/// 任一错误都会中止当前对话，不做重试
#[derive(Debug, Error)]
pub enum ConversationError {
    /// 会话存储不可用
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// 不支持的音频格式
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// 语音转写失败
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    /// 对话记忆无法反序列化
    #[error("Corrupt memory: {0}")]
    CorruptMemory(String),

    /// 语言模型推理失败
    #[error("Agent inference failed: {0}")]
    AgentInferenceFailed(String),

    /// 语音合成失败
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),
}

impl From<StoreError> for ConversationError {
    fn from(err: StoreError) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}

impl From<CodecError> for ConversationError {
    fn from(err: CodecError) -> Self {
        Self::UnsupportedFormat(err.to_string())
    }
}

impl From<TranscribeError> for ConversationError {
    fn from(err: TranscribeError) -> Self {
        Self::TranscriptionFailed(err.to_string())
    }
}

impl From<MemoryError> for ConversationError {
    fn from(err: MemoryError) -> Self {
        Self::CorruptMemory(err.to_string())
    }
}

impl From<AgentError> for ConversationError {
    fn from(err: AgentError) -> Self {
        Self::AgentInferenceFailed(err.to_string())
    }
}

impl From<SynthesisError> for ConversationError {
    fn from(err: SynthesisError) -> Self {
        Self::SynthesisFailed(err.to_string())
    }
}

/// 音色命令错误
#[derive(Debug, Error)]
pub enum VoiceCommandError {
    /// 缺少命令参数
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    /// 无法识别的音色序号
    #[error("Invalid voice index: {0}")]
    InvalidVoiceIndex(String),

    /// 当前合成器不支持按描述创建音色
    #[error("Voice creation is not supported by the active synthesizer")]
    VoiceCreationUnsupported,

    /// 会话存储错误
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl From<StoreError> for VoiceCommandError {
    fn from(err: StoreError) -> Self {
        Self::StorageUnavailable(err.to_string())
    }
}
