//! Fake Synthesizer - 用于测试的合成器
//!
//! 不调用外部服务，按文本长度生成一段正弦音，并记录收到的请求

use async_trait::async_trait;
use std::sync::Mutex;

use crate::application::ports::{
    AudioBuffer, SynthesisError, SynthesisRequest, SynthesizerCapabilities, SynthesizerPort,
};

/// Fake Synthesizer 配置
#[derive(Debug, Clone)]
pub struct FakeSynthesizerConfig {
    /// 每个字符对应的音频时长（毫秒）
    pub ms_per_char: u32,
    pub sample_rate: u32,
    pub capabilities: SynthesizerCapabilities,
    /// 设置后每次合成都返回该错误信息
    pub fail_with: Option<String>,
}

impl Default for FakeSynthesizerConfig {
    fn default() -> Self {
        Self {
            ms_per_char: 20,
            sample_rate: 16000,
            capabilities: SynthesizerCapabilities {
                persona_prompt: false,
                voice_attribute: "voice",
            },
            fail_with: None,
        }
    }
}

impl FakeSynthesizerConfig {
    pub fn with_persona(mut self) -> Self {
        self.capabilities = SynthesizerCapabilities {
            persona_prompt: true,
            voice_attribute: "voice_id",
        };
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }
}

/// Fake Synthesizer
pub struct FakeSynthesizer {
    config: FakeSynthesizerConfig,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl FakeSynthesizer {
    pub fn new(config: FakeSynthesizerConfig) -> Self {
        Self {
            config,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 已收到的请求
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl Default for FakeSynthesizer {
    fn default() -> Self {
        Self::new(FakeSynthesizerConfig::default())
    }
}

#[async_trait]
impl SynthesizerPort for FakeSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<AudioBuffer, SynthesisError> {
        tracing::debug!(
            text_len = request.text.len(),
            voice = ?request.voice,
            "FakeSynthesizer: generating tone"
        );

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(message) = &self.config.fail_with {
            return Err(SynthesisError::ServiceError(message.clone()));
        }

        let duration_ms = request.text.chars().count() as u64 * self.config.ms_per_char as u64;
        let frames = (self.config.sample_rate as u64 * duration_ms / 1000) as usize;
        let samples = (0..frames)
            .map(|i| {
                let t = i as f32 / self.config.sample_rate as f32;
                (t * 220.0 * 2.0 * std::f32::consts::PI).sin() * 0.3
            })
            .collect();

        Ok(AudioBuffer::new(samples, self.config.sample_rate, 1))
    }

    fn capabilities(&self) -> SynthesizerCapabilities {
        self.config.capabilities
    }
}
