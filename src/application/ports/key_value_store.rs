//! Key-Value Store Port - 持久化键值存储

use async_trait::async_trait;

use super::StoreError;

/// Key-Value Store Port
///
/// 会话持久化后端的最小接口
#[async_trait]
pub trait KeyValueStorePort: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    async fn flush(&self) -> Result<(), StoreError>;
}
