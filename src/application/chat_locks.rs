//! Per-Chat Locks
//!
//! 同一个 chat id 的读-改-写串行执行，避免并发消息互相覆盖对话记忆。
//! 锁是用例编排的一部分，命令处理器和 worker 共用同一个实例

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::conversation::ChatId;

/// 持有期间独占该 chat 的会话
///
/// 关闭串行化时为空守卫
pub struct ChatGuard {
    _guard: Option<OwnedMutexGuard<()>>,
}

/// 按 chat id 分配的互斥锁
pub struct ChatLocks {
    locks: DashMap<ChatId, Arc<Mutex<()>>>,
    enabled: bool,
}

impl ChatLocks {
    pub fn new(enabled: bool) -> Self {
        Self {
            locks: DashMap::new(),
            enabled,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 获取 chat 锁（关闭时立即返回）
    pub async fn acquire(&self, chat_id: ChatId) -> ChatGuard {
        if !self.enabled {
            return ChatGuard { _guard: None };
        }

        // 先克隆 Arc 再 await，不能持有 DashMap 分片锁等待
        let lock = self
            .locks
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        ChatGuard {
            _guard: Some(lock.lock_owned().await),
        }
    }

    /// 清理当前没有持有者的锁
    pub fn prune(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let removed = before - self.locks.len();
        if removed > 0 {
            tracing::debug!(removed = removed, "Pruned idle chat locks");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Default for ChatLocks {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_chat_is_exclusive() {
        let locks = ChatLocks::new(true);
        let guard = locks.acquire(ChatId::new(1)).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(ChatId::new(1))).await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire(ChatId::new(1))).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn test_different_chats_do_not_block() {
        let locks = ChatLocks::new(true);
        let _first = locks.acquire(ChatId::new(1)).await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(ChatId::new(2))).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_never_blocks() {
        let locks = ChatLocks::new(false);
        let _first = locks.acquire(ChatId::new(1)).await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(ChatId::new(1))).await;
        assert!(second.is_ok());
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = ChatLocks::new(true);
        let held = locks.acquire(ChatId::new(1)).await;
        drop(locks.acquire(ChatId::new(2)).await);

        assert_eq!(locks.prune(), 1);
        assert_eq!(locks.len(), 1);
        drop(held);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_empty());
    }
}
