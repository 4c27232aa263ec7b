//! Voice Codec Port - 语音编解码抽象
//!
//! 在平台语音消息的二进制编码（Ogg/Opus）与解码后的 PCM 缓冲区之间转换

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Unsupported format: {container}/{codec}")]
    UnsupportedFormat {
        container: ContainerFormat,
        codec: Codec,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Decoding error: {0}")]
    DecodingError(String),
}

/// 容器格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Ogg,
    Wav,
    Mp3,
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerFormat::Ogg => write!(f, "ogg"),
            ContainerFormat::Wav => write!(f, "wav"),
            ContainerFormat::Mp3 => write!(f, "mp3"),
        }
    }
}

/// 编码格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// Opus - Telegram 语音消息
    Opus,
    /// 16 位小端 PCM
    PcmS16Le,
    /// MPEG Layer III
    Mp3,
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Codec::Opus => write!(f, "opus"),
            Codec::PcmS16Le => write!(f, "pcm_s16le"),
            Codec::Mp3 => write!(f, "mp3"),
        }
    }
}

/// 解码后的音频
///
/// 交错排列的 f32 样本，取值范围 [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u8,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u8) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// 每声道帧数
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// 时长（毫秒）
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000) / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Voice Codec Port
///
/// 纯函数式接口，实现不持有共享可变状态
pub trait VoiceCodecPort: Send + Sync {
    /// 解码
    ///
    /// # Arguments
    /// * `data` - 容器格式的原始字节
    /// * `container` / `codec` - 不支持的组合返回 `CodecError::UnsupportedFormat`
    fn decode(
        &self,
        data: &[u8],
        container: ContainerFormat,
        codec: Codec,
    ) -> Result<AudioBuffer, CodecError>;

    /// 编码（decode 的逆操作，有损编码仅保证时长一致）
    fn encode(
        &self,
        audio: &AudioBuffer,
        container: ContainerFormat,
        codec: Codec,
    ) -> Result<Vec<u8>, CodecError>;

    /// 检查是否支持指定组合
    fn supports(&self, container: ContainerFormat, codec: Codec) -> bool;
}
