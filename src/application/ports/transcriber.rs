//! Transcriber Port - 语音转文字

use async_trait::async_trait;
use thiserror::Error;

use super::AudioBuffer;

/// 转写错误
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid audio: {0}")]
    InvalidAudio(String),
}

/// Transcriber Port
#[async_trait]
pub trait TranscriberPort: Send + Sync {
    async fn transcribe(&self, audio: &AudioBuffer) -> Result<String, TranscribeError>;
}
