//! Synthesizer Port - 语音合成抽象
//!
//! 定义 TTS 合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

use super::AudioBuffer;
use crate::domain::voice::Voice;

/// 合成错误
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 单次合成使用的音色
///
/// 每次请求独立携带，不修改共享的合成器状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceSelector {
    /// 服务商默认音色
    Default,
    /// 服务商音色 ID（映射到服务商各自的属性名，见 `SynthesizerCapabilities::voice_attribute`）
    Id(String),
    /// 人设提示词（仅部分服务商支持）
    Persona(String),
}

/// 合成器能力
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesizerCapabilities {
    /// 是否支持按人设描述生成音色
    pub persona_prompt: bool,
    /// 服务商请求中携带音色 ID 的字段名（voice_id / voice / name / speaker_id / tl）
    pub voice_attribute: &'static str,
}

impl VoiceSelector {
    /// 根据当前音色和合成器能力决定本次使用的音色
    ///
    /// 1. 支持人设且音色有 description → Persona
    /// 2. 否则音色有 id → Id
    /// 3. 否则使用服务商默认
    pub fn for_voice(voice: &Voice, capabilities: SynthesizerCapabilities) -> Self {
        if capabilities.persona_prompt {
            if let Some(description) = voice.description() {
                return VoiceSelector::Persona(description.to_string());
            }
        }
        match voice.id() {
            Some(id) => VoiceSelector::Id(id.to_string()),
            None => VoiceSelector::Default,
        }
    }
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: VoiceSelector,
}

/// Synthesizer Port
#[async_trait]
pub trait SynthesizerPort: Send + Sync {
    /// 合成文本，返回解码后的音频
    async fn synthesize(&self, request: SynthesisRequest) -> Result<AudioBuffer, SynthesisError>;

    /// 合成器能力（配置期确定）
    fn capabilities(&self) -> SynthesizerCapabilities;
}
