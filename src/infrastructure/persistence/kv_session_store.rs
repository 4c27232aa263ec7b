//! Key-Value backed Session Store
//!
//! 会话以 bincode 编码存储在 `session:<chat_id>` 键下

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::ports::{KeyValueStorePort, SessionStorePort, StoreError};
use crate::domain::conversation::{ChatId, Session};
use crate::domain::voice::VoiceCatalog;

/// 内部存储记录
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalSessionRecord {
    chat_id: i64,
    session: Session,
    stored_at: i64,
}

/// 基于键值存储的会话存储
pub struct KvSessionStore {
    kv: Arc<dyn KeyValueStorePort>,
    catalog: VoiceCatalog,
}

impl KvSessionStore {
    pub fn new(kv: Arc<dyn KeyValueStorePort>, catalog: VoiceCatalog) -> Self {
        Self { kv, catalog }
    }

    fn key(chat_id: ChatId) -> String {
        format!("session:{}", chat_id)
    }

    fn encode(chat_id: ChatId, session: Session) -> Result<Vec<u8>, StoreError> {
        let record = InternalSessionRecord {
            chat_id: chat_id.as_i64(),
            session,
            stored_at: Utc::now().timestamp(),
        };
        bincode::serialize(&record).map_err(|e| StoreError::SerializationError(e.to_string()))
    }

    fn decode(data: &[u8]) -> Result<Session, StoreError> {
        let record: InternalSessionRecord = bincode::deserialize(data)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        Ok(record.session)
    }
}

#[async_trait]
impl SessionStorePort for KvSessionStore {
    async fn get_or_create(&self, chat_id: ChatId) -> Result<Session, StoreError> {
        let key = Self::key(chat_id);

        if let Some(data) = self.kv.get(&key).await? {
            return Self::decode(&data);
        }

        let session = Session::new(&self.catalog);
        self.kv
            .set(&key, Self::encode(chat_id, session.clone())?)
            .await?;
        tracing::info!(chat_id = %chat_id, "Session created");
        Ok(session)
    }

    async fn put(&self, chat_id: ChatId, session: Session) -> Result<(), StoreError> {
        let data = Self::encode(chat_id, session)?;
        let size = data.len();
        self.kv.set(&Self::key(chat_id), data).await?;
        tracing::debug!(chat_id = %chat_id, size_bytes = size, "Session stored");
        Ok(())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.kv.flush().await
    }
}
