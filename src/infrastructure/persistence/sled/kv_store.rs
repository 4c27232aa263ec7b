//! Sled-based Key-Value Store Implementation

use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{KeyValueStorePort, StoreError};

/// Sled 存储配置
#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    /// 数据库路径
    pub db_path: String,
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/sessions.sled".to_string(),
        }
    }
}

/// Sled 键值存储
pub struct SledKeyValueStore {
    db: Db,
}

impl SledKeyValueStore {
    /// 打开（或创建）数据库
    pub fn new(config: &SledStoreConfig) -> Result<Self, StoreError> {
        let db = sled::open(&config.db_path).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        tracing::info!(
            db_path = %config.db_path,
            entries = db.len(),
            "SledKeyValueStore initialized"
        );

        Ok(Self { db })
    }

    /// 打开现有数据库
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let config = SledStoreConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 统计指定前缀的条目数
    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.db.scan_prefix(prefix).count()
    }
}

#[async_trait]
impl KeyValueStorePort for SledKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.db
            .get(key)
            .map(|value| value.map(|v| v.to_vec()))
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.db
            .insert(key, value)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let bytes = self
            .db
            .flush_async()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        tracing::debug!(bytes = bytes, "SledKeyValueStore flushed");
        Ok(())
    }
}
