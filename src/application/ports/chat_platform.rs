//! Chat Platform Port - 聊天平台出站接口

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::conversation::ChatId;

/// 平台错误
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Chat Platform Port
#[async_trait]
pub trait ChatPlatformPort: Send + Sync {
    /// 发送文本消息
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), PlatformError>;

    /// 发送语音消息（Ogg/Opus 字节）
    async fn send_voice(&self, chat_id: ChatId, voice: Vec<u8>) -> Result<(), PlatformError>;

    /// 下载用户发送的语音文件
    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, PlatformError>;
}
