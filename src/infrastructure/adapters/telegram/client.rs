//! Telegram Bot API Client
//!
//! 实现 ChatPlatformPort，另提供 long polling 与 webhook 注册

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use super::types::{ApiResponse, TelegramFile, Update};
use crate::application::ports::{ChatPlatformPort, PlatformError};
use crate::domain::conversation::ChatId;

/// Telegram 客户端配置
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub token: String,
    pub api_base_url: String,
    /// 普通请求超时（秒）
    pub timeout_secs: u64,
    /// long polling 等待时间（秒）
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: "https://api.telegram.org".to_string(),
            timeout_secs: 30,
            poll_timeout_secs: 30,
        }
    }
}

impl TelegramConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }
}

/// Telegram Bot API 客户端
pub struct TelegramClient {
    client: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    pub fn new(config: TelegramConfig) -> Result<Self, PlatformError> {
        // long polling 的请求会挂起 poll_timeout_secs，总超时要留出余量
        let client = Client::builder()
            .timeout(Duration::from_secs(
                config.timeout_secs + config.poll_timeout_secs,
            ))
            .build()
            .map_err(|e| PlatformError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.token,
            file_path
        )
    }

    /// 调用 JSON 方法
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, PlatformError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(format!("{}: {}", method, e.without_url())))?;

        if !body.ok {
            return Err(PlatformError::ApiError(format!(
                "{} failed (HTTP {}): {}",
                method,
                status,
                body.description.unwrap_or_default()
            )));
        }

        body.result
            .ok_or_else(|| PlatformError::InvalidResponse(format!("{}: missing result", method)))
    }

    /// 拉取更新（long polling）
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, PlatformError> {
        let mut body = json!({
            "timeout": self.config.poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body).await
    }

    /// 注册 webhook
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<(), PlatformError> {
        let mut body = json!({
            "url": url,
            "allowed_updates": ["message"],
        });
        if let Some(secret) = secret_token {
            body["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", body).await?;
        tracing::info!(url = %url, "Telegram webhook registered");
        Ok(())
    }

    /// 删除 webhook（切换到 long polling 前必须调用）
    pub async fn delete_webhook(&self) -> Result<(), PlatformError> {
        let _: bool = self.call("deleteWebhook", json!({})).await?;
        tracing::debug!("Telegram webhook removed");
        Ok(())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> PlatformError {
    // URL 中含有 bot token，不能出现在错误信息里
    if e.is_timeout() {
        PlatformError::Timeout
    } else {
        PlatformError::NetworkError(e.without_url().to_string())
    }
}

#[async_trait]
impl ChatPlatformPort for TelegramClient {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), PlatformError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                json!({ "chat_id": chat_id.as_i64(), "text": text }),
            )
            .await?;
        tracing::debug!(chat_id = %chat_id, text_len = text.len(), "Text message sent");
        Ok(())
    }

    async fn send_voice(&self, chat_id: ChatId, voice: Vec<u8>) -> Result<(), PlatformError> {
        let size = voice.len();
        let part = Part::bytes(voice)
            .file_name("voice.ogg")
            .mime_str("audio/ogg")
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        let form = Form::new()
            .text("chat_id", chat_id.as_i64().to_string())
            .part("voice", part);

        let response = self
            .client
            .post(self.method_url("sendVoice"))
            .multipart(form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let _: serde_json::Value = Self::unwrap_response("sendVoice", response).await?;

        tracing::debug!(chat_id = %chat_id, size_bytes = size, "Voice message sent");
        Ok(())
    }

    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, PlatformError> {
        let file: TelegramFile = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = file.file_path.ok_or_else(|| {
            PlatformError::InvalidResponse(format!("File {} has no download path", file.file_id))
        })?;

        let response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::ApiError(format!(
                "File download failed (HTTP {})",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlatformError::NetworkError(e.without_url().to_string()))?;

        tracing::debug!(file_id = %file_id, size_bytes = bytes.len(), "Voice file downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = TelegramClient::new(TelegramConfig {
            api_base_url: "http://bot.local/".into(),
            ..TelegramConfig::new("123:abc")
        })
        .unwrap();
        assert_eq!(client.method_url("getMe"), "http://bot.local/bot123:abc/getMe");
        assert_eq!(
            client.file_url("voice/file_1.oga"),
            "http://bot.local/file/bot123:abc/voice/file_1.oga"
        );
    }

    #[test]
    fn test_default_config() {
        let config = TelegramConfig::default();
        assert_eq!(config.api_base_url, "https://api.telegram.org");
        assert_eq!(config.poll_timeout_secs, 30);
    }
}
