//! Whisper Transcriber - `/audio/transcriptions` 客户端
//!
//! 解码后的音频先编码为 WAV，再以 multipart 上传

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

use super::client::OpenAiClientConfig;
use crate::application::ports::{
    AudioBuffer, Codec, ContainerFormat, TranscribeError, TranscriberPort, VoiceCodecPort,
};

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// Whisper 转写器
pub struct WhisperTranscriber {
    client: Client,
    config: OpenAiClientConfig,
    model: String,
    codec: Arc<dyn VoiceCodecPort>,
}

impl WhisperTranscriber {
    pub fn new(
        config: OpenAiClientConfig,
        model: impl Into<String>,
        codec: Arc<dyn VoiceCodecPort>,
    ) -> Result<Self, TranscribeError> {
        let client = config
            .build_client()
            .map_err(|e| TranscribeError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            config,
            model: model.into(),
            codec,
        })
    }
}

#[async_trait]
impl TranscriberPort for WhisperTranscriber {
    async fn transcribe(&self, audio: &AudioBuffer) -> Result<String, TranscribeError> {
        if audio.is_empty() {
            return Err(TranscribeError::InvalidAudio("Empty audio".to_string()));
        }

        let wav = self
            .codec
            .encode(audio, ContainerFormat::Wav, Codec::PcmS16Le)
            .map_err(|e| TranscribeError::InvalidAudio(e.to_string()))?;

        let part = Part::bytes(wav)
            .file_name("voice.wav")
            .mime_str("audio/wav")
            .map_err(|e| TranscribeError::InvalidAudio(e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let url = self.config.endpoint("audio/transcriptions");
        tracing::debug!(
            url = %url,
            duration_ms = audio.duration_ms(),
            "Sending transcription request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranscribeError::Timeout
                } else {
                    TranscribeError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::ServiceError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::ServiceError(format!("Invalid response: {}", e)))?;

        let text = body.text.trim().to_string();
        tracing::info!(text_len = text.len(), "Transcription completed");
        Ok(text)
    }
}
