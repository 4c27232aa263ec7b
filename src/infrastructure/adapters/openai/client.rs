//! OpenAI 兼容服务的共享客户端配置

use reqwest::Client;
use std::time::Duration;

/// OpenAI 兼容服务配置
#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    pub api_key: String,
    /// 不带结尾斜杠，如 `https://api.openai.com/v1`
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

impl OpenAiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub(super) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub(super) fn build_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_slash() {
        let config = OpenAiClientConfig::new("sk").with_base_url("http://llm.local/v1/");
        assert_eq!(config.endpoint("chat/completions"), "http://llm.local/v1/chat/completions");
    }

    #[test]
    fn test_defaults() {
        let config = OpenAiClientConfig::default().with_timeout(5);
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout_secs, 5);
    }
}
