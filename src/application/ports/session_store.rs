//! Session Store Port - 会话存储
//!
//! 定义会话存储的抽象接口，具体实现在 infrastructure/memory 和 infrastructure/persistence 层

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::conversation::{ChatId, Session};

/// Session Store 错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Session Store Port
///
/// 以 chat id 为键的会话存储
/// - `get_or_create` 对从未出现过的 chat id 会写入默认会话（读触发写）
/// - `put` 覆盖旧值
#[async_trait]
pub trait SessionStorePort: Send + Sync {
    /// 获取会话，不存在时创建默认会话并保存
    async fn get_or_create(&self, chat_id: ChatId) -> Result<Session, StoreError>;

    /// 保存会话（覆盖）
    async fn put(&self, chat_id: ChatId, session: Session) -> Result<(), StoreError>;

    /// 将缓冲数据刷到后端存储（进程退出前调用）
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
