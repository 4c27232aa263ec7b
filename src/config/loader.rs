//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml / config.local.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, StorageBackend, TelegramMode};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

const ENV_PREFIX: &str = "VOXRELAY";

/// 加载应用配置
///
/// # 环境变量示例
/// - `VOXRELAY_TELEGRAM__TOKEN=123456:ABC`
/// - `VOXRELAY_OPENAI__API_KEY=sk-...`
/// - `VOXRELAY_SYNTHESIZER__PROVIDER__KIND=elevenlabs`
/// - `VOXRELAY_STORAGE__BACKEND=sled`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索工作目录下的默认配置文件
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .set_default("telegram.api_base_url", "https://api.telegram.org")?
        .set_default("telegram.mode", "polling")?
        .set_default("telegram.poll_timeout_secs", 30)?
        .set_default("telegram.timeout_secs", 30)?
        .set_default("telegram.max_concurrent", 8)?
        .set_default("server.enabled", false)?
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("openai.base_url", "https://api.openai.com/v1")?
        .set_default("openai.model", "gpt-3.5-turbo")?
        .set_default("openai.max_tokens", 256)?
        .set_default("openai.transcription_model", "whisper-1")?
        .set_default("openai.timeout_secs", 60)?
        .set_default("synthesizer.timeout_secs", 60)?
        .set_default("conversation.serialize_per_chat", true)?
        .set_default("memory.on_corrupt", "abort")?
        .set_default("storage.backend", "memory")?
        .set_default("storage.sled_path", "data/sessions.sled")?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 例如: VOXRELAY_TELEGRAM__MODE=webhook
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.telegram.token.trim().is_empty() {
        return Err(invalid("telegram.token cannot be empty"));
    }

    if config.openai.api_key.trim().is_empty() {
        return Err(invalid("openai.api_key cannot be empty"));
    }

    if config.telegram.max_concurrent == 0 {
        return Err(invalid("telegram.max_concurrent must be at least 1"));
    }

    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.telegram.mode == TelegramMode::Webhook {
        if !config.server.enabled {
            return Err(invalid("webhook mode requires server.enabled = true"));
        }
        let has_url = config
            .telegram
            .webhook_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        if !has_url {
            return Err(invalid("webhook mode requires telegram.webhook_url"));
        }
    }

    if config.storage.backend == StorageBackend::Sled && config.storage.sled_path.trim().is_empty() {
        return Err(invalid("storage.sled_path cannot be empty for the sled backend"));
    }

    config
        .synthesizer
        .provider
        .validate()
        .map_err(|e| invalid(format!("synthesizer.provider: {}", e)))?;

    Ok(())
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "***"
    }
}

/// 打印配置信息（密钥脱敏）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!(
        mode = ?config.telegram.mode,
        api = %config.telegram.api_base_url,
        token = redact(&config.telegram.token),
        webhook_url = ?config.telegram.webhook_url,
        max_concurrent = config.telegram.max_concurrent,
        "Telegram"
    );
    if config.server.enabled {
        tracing::info!(addr = %config.server.addr(), "HTTP server");
    }
    tracing::info!(
        base_url = %config.openai.base_url,
        api_key = redact(&config.openai.api_key),
        model = %config.openai.model,
        max_tokens = config.openai.max_tokens,
        transcription_model = %config.openai.transcription_model,
        "OpenAI"
    );
    tracing::info!(
        provider = ?config.synthesizer.provider.redacted(),
        timeout_secs = config.synthesizer.timeout_secs,
        "Synthesizer"
    );
    tracing::info!(
        serialize_per_chat = config.conversation.serialize_per_chat,
        custom_voices = config.conversation.voices.as_ref().map_or(0, Vec::len),
        on_corrupt = ?config.memory.on_corrupt,
        "Conversation"
    );
    tracing::info!(
        backend = ?config.storage.backend,
        sled_path = %config.storage.sled_path,
        "Storage"
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
