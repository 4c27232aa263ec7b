//! Agent Port - 语言模型代理
//!
//! 代理由 (系统提示词, 模型, max_tokens, 记忆) 构造，
//! 每次 `respond` 后其记忆包含最新一轮对话

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::conversation::ConversationMemory;

/// 代理错误
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 代理构造参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub system_prompt: String,
    pub model: String,
    pub max_tokens: u32,
}

/// 单个会话的代理实例
#[async_trait]
pub trait AgentPort: Send {
    /// 回复用户输入，成功时把这一轮写入记忆
    async fn respond(&mut self, input: &str) -> Result<String, AgentError>;

    /// 当前记忆
    fn memory(&self) -> &ConversationMemory;
}

/// Agent Factory Port
pub trait AgentFactoryPort: Send + Sync {
    fn create(&self, config: AgentConfig, memory: ConversationMemory) -> Box<dyn AgentPort>;
}
