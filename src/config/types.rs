//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;

use crate::application::CorruptMemoryPolicy;
use crate::domain::voice::Voice;
use crate::infrastructure::adapters::SynthesizerProvider;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Telegram 配置
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// HTTP 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// OpenAI（转写 + 对话）配置
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// 语音合成配置
    #[serde(default)]
    pub synthesizer: SynthesizerConfig,

    /// 对话配置
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// 对话记忆配置
    #[serde(default)]
    pub memory: MemoryConfig,

    /// 会话存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 更新接收方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TelegramMode {
    #[default]
    Polling,
    Webhook,
}

/// Telegram 配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token
    #[serde(default)]
    pub token: String,

    #[serde(default = "default_telegram_api")]
    pub api_base_url: String,

    #[serde(default)]
    pub mode: TelegramMode,

    /// webhook 模式下注册给 Telegram 的公开地址
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// webhook secret token，校验 `X-Telegram-Bot-Api-Secret-Token`
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// long polling 等待时间（秒）
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// 普通请求超时（秒）
    #[serde(default = "default_telegram_timeout")]
    pub timeout_secs: u64,

    /// 同时处理的消息数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_telegram_timeout() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    8
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base_url: default_telegram_api(),
            mode: TelegramMode::default(),
            webhook_url: None,
            webhook_secret: None,
            poll_timeout_secs: default_poll_timeout(),
            timeout_secs: default_telegram_timeout(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 是否启动 HTTP 服务器（webhook 模式必须启用）
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// OpenAI 配置
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_openai_url")]
    pub base_url: String,

    /// 对话模型
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 语音转写模型
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,

    /// 请求超时（秒）
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_tokens() -> u32 {
    256
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_openai_timeout() -> u64 {
    60
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            transcription_model: default_transcription_model(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

/// 语音合成配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizerConfig {
    /// 服务商及其参数，按 `kind` 区分
    #[serde(default)]
    pub provider: SynthesizerProvider,

    /// 请求超时（秒）
    #[serde(default = "default_synthesizer_timeout")]
    pub timeout_secs: u64,
}

fn default_synthesizer_timeout() -> u64 {
    60
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            provider: SynthesizerProvider::default(),
            timeout_secs: default_synthesizer_timeout(),
        }
    }
}

/// 对话配置
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// 基础系统提示词
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// 同一 chat 的消息串行处理
    #[serde(default = "default_serialize_per_chat")]
    pub serialize_per_chat: bool,

    /// 覆盖服务商内置的音色列表
    #[serde(default)]
    pub voices: Option<Vec<Voice>>,
}

fn default_system_prompt() -> String {
    "You are a friendly voice assistant. Keep your answers short and conversational.".to_string()
}

fn default_serialize_per_chat() -> bool {
    true
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            serialize_per_chat: default_serialize_per_chat(),
            voices: None,
        }
    }
}

impl ConversationConfig {
    /// 实际使用的音色列表
    pub fn voice_catalog(&self, provider: &SynthesizerProvider) -> Vec<Voice> {
        match &self.voices {
            Some(voices) if !voices.is_empty() => voices.clone(),
            _ => provider.default_voices(),
        }
    }
}

/// 对话记忆配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryConfig {
    /// 记忆无法解析时的处理方式
    #[serde(default)]
    pub on_corrupt: CorruptMemoryPolicy,
}

/// 会话存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_sled_path")]
    pub sled_path: String,
}

fn default_sled_path() -> String {
    "data/sessions.sled".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            sled_path: default_sled_path(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
