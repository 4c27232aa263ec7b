//! Voice Command Handlers
//!
//! 切换或新建音色都会清空该 chat 的对话记忆

use std::sync::Arc;

use crate::application::commands::{CreateVoice, SelectVoice};
use crate::application::error::VoiceCommandError;
use crate::application::ports::{SessionStorePort, SynthesizerCapabilities};
use crate::domain::voice::Voice;
use crate::application::chat_locks::ChatLocks;

// ============================================================================
// SelectVoice
// ============================================================================

/// SelectVoice Handler
pub struct SelectVoiceHandler {
    store: Arc<dyn SessionStorePort>,
    locks: Arc<ChatLocks>,
}

impl SelectVoiceHandler {
    pub fn new(store: Arc<dyn SessionStorePort>, locks: Arc<ChatLocks>) -> Self {
        Self { store, locks }
    }

    /// 返回切换后的音色
    pub async fn handle(&self, cmd: SelectVoice) -> Result<Voice, VoiceCommandError> {
        let raw = cmd.index.trim();
        if raw.is_empty() {
            return Err(VoiceCommandError::MissingArgument("index"));
        }
        let index: usize = raw
            .parse()
            .map_err(|_| VoiceCommandError::InvalidVoiceIndex(raw.to_string()))?;

        let _guard = self.locks.acquire(cmd.chat_id).await;
        let mut session = self.store.get_or_create(cmd.chat_id).await?;

        let voice = session
            .select_voice(index)
            .map_err(|_| VoiceCommandError::InvalidVoiceIndex(raw.to_string()))?
            .clone();
        self.store.put(cmd.chat_id, session).await?;

        tracing::info!(
            chat_id = %cmd.chat_id,
            index = index,
            voice = %voice.label(),
            "Voice selected"
        );

        Ok(voice)
    }
}

// ============================================================================
// CreateVoice
// ============================================================================

/// CreateVoice Handler
pub struct CreateVoiceHandler {
    store: Arc<dyn SessionStorePort>,
    locks: Arc<ChatLocks>,
    capabilities: SynthesizerCapabilities,
}

impl CreateVoiceHandler {
    pub fn new(
        store: Arc<dyn SessionStorePort>,
        locks: Arc<ChatLocks>,
        capabilities: SynthesizerCapabilities,
    ) -> Self {
        Self {
            store,
            locks,
            capabilities,
        }
    }

    /// 返回新音色的序号
    pub async fn handle(&self, cmd: CreateVoice) -> Result<usize, VoiceCommandError> {
        if !self.capabilities.persona_prompt {
            return Err(VoiceCommandError::VoiceCreationUnsupported);
        }
        let description = cmd.description.trim();
        if description.is_empty() {
            return Err(VoiceCommandError::MissingArgument("description"));
        }

        let _guard = self.locks.acquire(cmd.chat_id).await;
        let mut session = self.store.get_or_create(cmd.chat_id).await?;
        let index = session.add_voice(Voice::from_description(description));
        self.store.put(cmd.chat_id, session).await?;

        tracing::info!(
            chat_id = %cmd.chat_id,
            index = index,
            description = %description,
            "Voice created"
        );

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ChatId;
    use crate::domain::voice::VoiceCatalog;
    use crate::infrastructure::memory::InMemorySessionStore;

    const PERSONA: SynthesizerCapabilities = SynthesizerCapabilities {
        persona_prompt: true,
        voice_attribute: "voice_id",
    };
    const BY_ID: SynthesizerCapabilities = SynthesizerCapabilities {
        persona_prompt: false,
        voice_attribute: "voice",
    };

    fn store() -> Arc<InMemorySessionStore> {
        Arc::new(InMemorySessionStore::new(
            VoiceCatalog::new(vec![
                Voice::with_id("Brian", "Brian"),
                Voice::with_id("Amy", "Amy"),
            ])
            .unwrap(),
        ))
    }

    async fn with_memory(store: &InMemorySessionStore, chat_id: ChatId) {
        let mut session = store.get_or_create(chat_id).await.unwrap();
        session.record_memory(b"{\"version\":1,\"turns\":[]}".to_vec());
        store.put(chat_id, session).await.unwrap();
    }

    #[tokio::test]
    async fn test_select_voice_resets_memory() {
        let store = store();
        let chat_id = ChatId::new(1);
        with_memory(&store, chat_id).await;

        let handler = SelectVoiceHandler::new(store.clone(), Arc::new(ChatLocks::default()));
        let voice = handler
            .handle(SelectVoice {
                chat_id,
                index: " 1 ".into(),
            })
            .await
            .unwrap();
        assert_eq!(voice.name(), Some("Amy"));

        let session = store.get_or_create(chat_id).await.unwrap();
        assert_eq!(session.current_voice().name(), Some("Amy"));
        assert!(session.conversation_memory().is_none());
    }

    #[tokio::test]
    async fn test_select_voice_rejects_bad_index() {
        let store = store();
        let handler = SelectVoiceHandler::new(store.clone(), Arc::new(ChatLocks::default()));

        for raw in ["abc", "5", "-1"] {
            let result = handler
                .handle(SelectVoice {
                    chat_id: ChatId::new(2),
                    index: raw.into(),
                })
                .await;
            assert!(matches!(result, Err(VoiceCommandError::InvalidVoiceIndex(_))));
        }

        let result = handler
            .handle(SelectVoice {
                chat_id: ChatId::new(2),
                index: "".into(),
            })
            .await;
        assert!(matches!(result, Err(VoiceCommandError::MissingArgument(_))));
    }

    #[tokio::test]
    async fn test_create_voice_appends_and_selects() {
        let store = store();
        let chat_id = ChatId::new(3);
        with_memory(&store, chat_id).await;

        let handler = CreateVoiceHandler::new(store.clone(), Arc::new(ChatLocks::default()), PERSONA);
        let index = handler
            .handle(CreateVoice {
                chat_id,
                description: "a grumpy wizard".into(),
            })
            .await
            .unwrap();
        assert_eq!(index, 2);

        let session = store.get_or_create(chat_id).await.unwrap();
        assert_eq!(session.current_voice().description(), Some("a grumpy wizard"));
        assert!(session.current_voice().id().is_none());
        assert!(session.conversation_memory().is_none());
    }

    #[tokio::test]
    async fn test_create_voice_refused_without_persona_support() {
        let store = store();
        let handler = CreateVoiceHandler::new(store.clone(), Arc::new(ChatLocks::default()), BY_ID);
        let result = handler
            .handle(CreateVoice {
                chat_id: ChatId::new(4),
                description: "a pirate".into(),
            })
            .await;
        assert!(matches!(result, Err(VoiceCommandError::VoiceCreationUnsupported)));
        assert!(!store.contains(ChatId::new(4)));
    }

    #[tokio::test]
    async fn test_create_voice_requires_description() {
        let handler = CreateVoiceHandler::new(store(), Arc::new(ChatLocks::default()), PERSONA);
        let result = handler
            .handle(CreateVoice {
                chat_id: ChatId::new(5),
                description: "   ".into(),
            })
            .await;
        assert!(matches!(result, Err(VoiceCommandError::MissingArgument(_))));
    }
}
