//! In-Memory Session Store Implementation

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::application::ports::{SessionStorePort, StoreError};
use crate::domain::conversation::{ChatId, Session};
use crate::domain::voice::VoiceCatalog;

/// 内存会话存储
///
/// 会话随进程结束而丢失
pub struct InMemorySessionStore {
    sessions: DashMap<ChatId, Session>,
    catalog: VoiceCatalog,
}

impl InMemorySessionStore {
    pub fn new(catalog: VoiceCatalog) -> Self {
        Self {
            sessions: DashMap::new(),
            catalog,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, chat_id: ChatId) -> bool {
        self.sessions.contains_key(&chat_id)
    }
}

#[async_trait]
impl SessionStorePort for InMemorySessionStore {
    async fn get_or_create(&self, chat_id: ChatId) -> Result<Session, StoreError> {
        if let Some(session) = self.sessions.get(&chat_id) {
            return Ok(session.clone());
        }

        let session = self
            .sessions
            .entry(chat_id)
            .or_insert_with(|| {
                tracing::info!(chat_id = %chat_id, "Session created");
                Session::new(&self.catalog)
            })
            .clone();
        Ok(session)
    }

    async fn put(&self, chat_id: ChatId, session: Session) -> Result<(), StoreError> {
        self.sessions.insert(chat_id, session);
        tracing::debug!(chat_id = %chat_id, "Session stored");
        Ok(())
    }
}
