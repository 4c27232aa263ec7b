//! Conversation Handler - 对话交换编排
//!
//! 一次交换：转写（语音输入）→ 加载会话 → 恢复记忆 → 代理回复 → 合成语音
//! → 编码为语音消息 → 写回记忆。
//! 任一步失败都中止整次交换，不重试，也不写回会话。
//! 整次交换持有该 chat 的锁，同一 chat 的消息按到达顺序完成。

use serde::Deserialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::commands::{ConversationInput, Exchange, HandleMessage};
use crate::application::error::ConversationError;
use crate::application::ports::{
    AgentConfig, AgentFactoryPort, Codec, ContainerFormat, SessionStorePort, SynthesisRequest,
    SynthesizerPort, TranscriberPort, VoiceCodecPort, VoiceSelector,
};
use crate::domain::conversation::{effective_prompt, ConversationMemory, Session};
use crate::application::chat_locks::ChatLocks;

/// 记忆无法反序列化时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptMemoryPolicy {
    /// 中止本次交换
    #[default]
    Abort,
    /// 记录警告并从空记忆开始
    Reset,
}

/// 对话设置
#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub system_prompt: String,
    pub model: String,
    pub max_tokens: u32,
    pub on_corrupt: CorruptMemoryPolicy,
}

/// HandleMessage Handler
pub struct ConversationHandler {
    store: Arc<dyn SessionStorePort>,
    transcriber: Arc<dyn TranscriberPort>,
    agents: Arc<dyn AgentFactoryPort>,
    synthesizer: Arc<dyn SynthesizerPort>,
    codec: Arc<dyn VoiceCodecPort>,
    locks: Arc<ChatLocks>,
    settings: ConversationSettings,
}

impl ConversationHandler {
    pub fn new(
        store: Arc<dyn SessionStorePort>,
        transcriber: Arc<dyn TranscriberPort>,
        agents: Arc<dyn AgentFactoryPort>,
        synthesizer: Arc<dyn SynthesizerPort>,
        codec: Arc<dyn VoiceCodecPort>,
        locks: Arc<ChatLocks>,
        settings: ConversationSettings,
    ) -> Self {
        Self {
            store,
            transcriber,
            agents,
            synthesizer,
            codec,
            locks,
            settings,
        }
    }

    pub async fn handle(&self, cmd: HandleMessage) -> Result<Exchange, ConversationError> {
        let span = tracing::info_span!(
            "exchange",
            chat_id = %cmd.chat_id,
            exchange_id = %Uuid::new_v4()
        );
        self.run(cmd).instrument(span).await
    }

    async fn run(&self, cmd: HandleMessage) -> Result<Exchange, ConversationError> {
        let chat_id = cmd.chat_id;

        // 转写也在锁内，否则短语音可能越过先到的长语音
        let _guard = self.locks.acquire(chat_id).await;

        let text = match cmd.input {
            ConversationInput::Text(text) => text,
            ConversationInput::Audio(audio) => {
                let transcript = self.transcriber.transcribe(&audio).await?;
                tracing::info!(
                    duration_ms = audio.duration_ms(),
                    transcript_len = transcript.len(),
                    "Voice input transcribed"
                );
                transcript
            }
        };

        let mut session = self.store.get_or_create(chat_id).await?;
        let voice = session.current_voice().clone();

        let memory = self.restore_memory(&session)?;
        let mut agent = self.agents.create(
            AgentConfig {
                system_prompt: effective_prompt(&self.settings.system_prompt, &voice),
                model: self.settings.model.clone(),
                max_tokens: self.settings.max_tokens,
            },
            memory,
        );

        let response_text = agent.respond(&text).await?;

        let selector = VoiceSelector::for_voice(&voice, self.synthesizer.capabilities());
        let response_audio = self
            .synthesizer
            .synthesize(SynthesisRequest {
                text: response_text.clone(),
                voice: selector,
            })
            .await?;

        // 编码失败同样不能留下新记忆
        let response_voice = self
            .codec
            .encode(&response_audio, ContainerFormat::Ogg, Codec::Opus)?;

        let memory = agent.memory();
        session.record_memory(memory.encode()?);
        self.store.put(chat_id, session).await?;

        tracing::info!(
            voice = %voice.label(),
            memory_turns = memory.len(),
            response_len = response_text.len(),
            audio_ms = response_audio.duration_ms(),
            voice_bytes = response_voice.len(),
            "Exchange completed"
        );

        Ok(Exchange {
            response_text,
            response_audio,
            response_voice,
        })
    }

    fn restore_memory(&self, session: &Session) -> Result<ConversationMemory, ConversationError> {
        let Some(data) = session.conversation_memory() else {
            return Ok(ConversationMemory::new());
        };

        match ConversationMemory::decode(data) {
            Ok(memory) => Ok(memory),
            Err(e) => match self.settings.on_corrupt {
                CorruptMemoryPolicy::Abort => Err(e.into()),
                CorruptMemoryPolicy::Reset => {
                    tracing::warn!(error = %e, "Discarding corrupt conversation memory");
                    Ok(ConversationMemory::new())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::AudioBuffer;
    use crate::application::testing::{
        EchoAgentFactory, FailingAgentFactory, FailingEncoder, FailingSessionStore,
        FailingTranscriber, ScriptedTranscriber,
    };
    use crate::domain::conversation::ChatId;
    use crate::domain::voice::{Voice, VoiceCatalog};
    use crate::infrastructure::adapters::{FakeSynthesizer, FakeSynthesizerConfig, OpusVoiceCodec};
    use crate::infrastructure::memory::InMemorySessionStore;
    use std::time::Duration;

    struct Fixture {
        store: Arc<InMemorySessionStore>,
        agents: Arc<EchoAgentFactory>,
        transcriber: Arc<ScriptedTranscriber>,
        synthesizer: Arc<FakeSynthesizer>,
        handler: Arc<ConversationHandler>,
    }

    fn settings(on_corrupt: CorruptMemoryPolicy) -> ConversationSettings {
        ConversationSettings {
            system_prompt: "You are helpful.".into(),
            model: "gpt-3.5-turbo".into(),
            max_tokens: 256,
            on_corrupt,
        }
    }

    fn fixture_with(
        catalog: VoiceCatalog,
        synthesizer: FakeSynthesizer,
        on_corrupt: CorruptMemoryPolicy,
    ) -> Fixture {
        let store = Arc::new(InMemorySessionStore::new(catalog));
        let agents = Arc::new(EchoAgentFactory::default());
        let transcriber = Arc::new(ScriptedTranscriber::new("ping"));
        let synthesizer = Arc::new(synthesizer);
        let handler = Arc::new(ConversationHandler::new(
            store.clone(),
            transcriber.clone(),
            agents.clone(),
            synthesizer.clone(),
            Arc::new(OpusVoiceCodec::default()),
            Arc::new(ChatLocks::new(true)),
            settings(on_corrupt),
        ));
        Fixture {
            store,
            agents,
            transcriber,
            synthesizer,
            handler,
        }
    }

    fn catalog() -> VoiceCatalog {
        VoiceCatalog::new(vec![Voice::with_id("Brian", "Brian")]).unwrap()
    }

    fn fixture() -> Fixture {
        fixture_with(catalog(), FakeSynthesizer::default(), CorruptMemoryPolicy::Abort)
    }

    /// 用任意端口组合构造处理器，合成器固定为 FakeSynthesizer
    fn handler_with(
        store: Arc<dyn SessionStorePort>,
        transcriber: Arc<dyn TranscriberPort>,
        agents: Arc<dyn AgentFactoryPort>,
        codec: Arc<dyn VoiceCodecPort>,
    ) -> Arc<ConversationHandler> {
        Arc::new(ConversationHandler::new(
            store,
            transcriber,
            agents,
            Arc::new(FakeSynthesizer::default()),
            codec,
            Arc::new(ChatLocks::new(true)),
            settings(CorruptMemoryPolicy::Abort),
        ))
    }

    fn audio(chat_id: i64) -> HandleMessage {
        HandleMessage {
            chat_id: ChatId::new(chat_id),
            input: ConversationInput::Audio(AudioBuffer::new(vec![0.1; 4800], 48000, 1)),
        }
    }

    fn text(chat_id: i64, text: &str) -> HandleMessage {
        HandleMessage {
            chat_id: ChatId::new(chat_id),
            input: ConversationInput::Text(text.into()),
        }
    }

    #[tokio::test]
    async fn test_text_exchange_echoes_and_persists_memory() {
        let f = fixture();

        let exchange = f.handler.handle(text(42, "hello")).await.unwrap();
        assert_eq!(exchange.response_text, "hello");
        assert!(!exchange.response_audio.is_empty());
        assert_eq!(&exchange.response_voice[0..4], b"OggS");

        let session = f.store.get_or_create(ChatId::new(42)).await.unwrap();
        let memory = ConversationMemory::decode(session.conversation_memory().unwrap()).unwrap();
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.turns()[0].text, "hello");
    }

    #[tokio::test]
    async fn test_audio_input_is_transcribed_first() {
        let f = fixture();

        let exchange = f.handler.handle(audio(7)).await.unwrap();

        assert_eq!(f.agents.inputs(), vec!["ping".to_string()]);
        assert_eq!(exchange.response_text, "ping");
        assert_eq!(f.transcriber.calls(), 1);
    }

    #[tokio::test]
    async fn test_second_exchange_restores_prior_memory() {
        let f = fixture();
        f.handler.handle(text(42, "first")).await.unwrap();
        f.handler.handle(text(42, "second")).await.unwrap();

        let created = f.agents.created();
        assert_eq!(created.len(), 2);
        assert!(created[0].1.is_empty());
        assert_eq!(created[1].1.len(), 2);
        assert_eq!(created[1].1.turns()[0].text, "first");
    }

    #[tokio::test]
    async fn test_persona_description_augments_prompt() {
        let catalog = VoiceCatalog::new(vec![Voice::new(
            None,
            Some("Bob".into()),
            Some("pirate".into()),
        )])
        .unwrap();
        let f = fixture_with(
            catalog,
            FakeSynthesizer::new(FakeSynthesizerConfig::default().with_persona()),
            CorruptMemoryPolicy::Abort,
        );

        f.handler.handle(text(1, "ahoy")).await.unwrap();

        let (config, _) = f.agents.created().remove(0);
        assert!(config.system_prompt.ends_with("Pretend to be pirate."));
        assert!(!config.system_prompt.contains("Bob"));
        assert_eq!(
            f.synthesizer.requests()[0].voice,
            VoiceSelector::Persona("pirate".into())
        );
    }

    #[tokio::test]
    async fn test_voice_id_selects_synthesizer_voice() {
        let f = fixture();
        f.handler.handle(text(3, "hi")).await.unwrap();
        assert_eq!(
            f.synthesizer.requests()[0].voice,
            VoiceSelector::Id("Brian".into())
        );
    }

    #[tokio::test]
    async fn test_corrupt_memory_aborts_by_default() {
        let f = fixture();
        let mut session = f.store.get_or_create(ChatId::new(9)).await.unwrap();
        session.record_memory(b"\x80\x04garbage".to_vec());
        f.store.put(ChatId::new(9), session.clone()).await.unwrap();

        let result = f.handler.handle(text(9, "hello")).await;
        assert!(matches!(result, Err(ConversationError::CorruptMemory(_))));
        assert!(f.agents.created().is_empty());

        // 会话未被改写
        let stored = f.store.get_or_create(ChatId::new(9)).await.unwrap();
        assert_eq!(stored, session);
    }

    #[tokio::test]
    async fn test_corrupt_memory_reset_policy_starts_fresh() {
        let f = fixture_with(catalog(), FakeSynthesizer::default(), CorruptMemoryPolicy::Reset);
        let mut session = f.store.get_or_create(ChatId::new(9)).await.unwrap();
        session.record_memory(br#"{"version":99,"turns":[]}"#.to_vec());
        f.store.put(ChatId::new(9), session).await.unwrap();

        let exchange = f.handler.handle(text(9, "hello")).await.unwrap();
        assert_eq!(exchange.response_text, "hello");
        assert!(f.agents.created()[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_previous_memory() {
        let f = fixture_with(
            catalog(),
            FakeSynthesizer::new(FakeSynthesizerConfig::default().failing("quota exceeded")),
            CorruptMemoryPolicy::Abort,
        );

        let result = f.handler.handle(text(5, "hello")).await;
        assert!(matches!(result, Err(ConversationError::SynthesisFailed(_))));

        let session = f.store.get_or_create(ChatId::new(5)).await.unwrap();
        assert!(session.conversation_memory().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_exchanges_on_same_chat_keep_both_turns() {
        let f = fixture();

        let a = {
            let handler = f.handler.clone();
            tokio::spawn(async move { handler.handle(text(11, "one")).await })
        };
        let b = {
            let handler = f.handler.clone();
            tokio::spawn(async move { handler.handle(text(11, "two")).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let session = f.store.get_or_create(ChatId::new(11)).await.unwrap();
        let memory = ConversationMemory::decode(session.conversation_memory().unwrap()).unwrap();
        assert_eq!(memory.len(), 4);
    }

    #[tokio::test]
    async fn test_transcription_failure_aborts_before_loading_session() {
        let store = Arc::new(InMemorySessionStore::new(catalog()));
        let transcriber = Arc::new(FailingTranscriber::default());
        let agents = Arc::new(EchoAgentFactory::default());
        let handler = handler_with(
            store.clone(),
            transcriber.clone(),
            agents.clone(),
            Arc::new(OpusVoiceCodec::default()),
        );

        let result = handler.handle(audio(21)).await;
        match result {
            Err(ConversationError::TranscriptionFailed(msg)) => assert!(msg.contains("503")),
            other => panic!("expected TranscriptionFailed, got {:?}", other),
        }

        assert_eq!(transcriber.calls(), 1);
        assert!(agents.created().is_empty());
        assert!(!store.contains(ChatId::new(21)));
    }

    #[tokio::test]
    async fn test_agent_failure_keeps_previous_memory() {
        let f = fixture();
        f.handler.handle(text(22, "first")).await.unwrap();
        let before = f.store.get_or_create(ChatId::new(22)).await.unwrap();

        let agents = Arc::new(FailingAgentFactory::default());
        let handler = handler_with(
            f.store.clone(),
            f.transcriber.clone(),
            agents.clone(),
            Arc::new(OpusVoiceCodec::default()),
        );

        let result = handler.handle(text(22, "second")).await;
        assert!(matches!(result, Err(ConversationError::AgentInferenceFailed(_))));
        assert_eq!(agents.responds(), 1);

        let after = f.store.get_or_create(ChatId::new(22)).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_store_read_failure_aborts_before_agent() {
        let inner = Arc::new(InMemorySessionStore::new(catalog()));
        let store = Arc::new(FailingSessionStore::on_read(inner.clone()));
        let agents = Arc::new(EchoAgentFactory::default());
        let handler = handler_with(
            store.clone(),
            Arc::new(ScriptedTranscriber::new("ping")),
            agents.clone(),
            Arc::new(OpusVoiceCodec::default()),
        );

        let result = handler.handle(text(23, "hello")).await;
        assert!(matches!(result, Err(ConversationError::StorageUnavailable(_))));
        assert_eq!(store.reads(), 1);
        assert_eq!(store.puts(), 0);
        assert!(agents.created().is_empty());
        assert!(inner.is_empty());
    }

    #[tokio::test]
    async fn test_store_write_failure_is_reported() {
        let inner = Arc::new(InMemorySessionStore::new(catalog()));
        let store = Arc::new(FailingSessionStore::on_write(inner.clone()));
        let handler = handler_with(
            store.clone(),
            Arc::new(ScriptedTranscriber::new("ping")),
            Arc::new(EchoAgentFactory::default()),
            Arc::new(OpusVoiceCodec::default()),
        );

        let result = handler.handle(text(24, "hello")).await;
        assert!(matches!(result, Err(ConversationError::StorageUnavailable(_))));
        assert_eq!(store.puts(), 1);

        let session = inner.get_or_create(ChatId::new(24)).await.unwrap();
        assert!(session.conversation_memory().is_none());
    }

    #[tokio::test]
    async fn test_encode_failure_keeps_previous_memory() {
        let store = Arc::new(InMemorySessionStore::new(catalog()));
        let codec = Arc::new(FailingEncoder::default());
        let handler = handler_with(
            store.clone(),
            Arc::new(ScriptedTranscriber::new("ping")),
            Arc::new(EchoAgentFactory::default()),
            codec.clone(),
        );

        let result = handler.handle(text(25, "hello")).await;
        assert!(matches!(result, Err(ConversationError::UnsupportedFormat(_))));
        assert_eq!(codec.encodes(), 1);

        let session = store.get_or_create(ChatId::new(25)).await.unwrap();
        assert!(session.conversation_memory().is_none());
    }

    #[tokio::test]
    async fn test_slow_transcription_keeps_arrival_order() {
        let store = Arc::new(InMemorySessionStore::new(catalog()));
        let handler = handler_with(
            store.clone(),
            Arc::new(ScriptedTranscriber::new("spoken").with_delay(Duration::from_millis(100))),
            Arc::new(EchoAgentFactory::default()),
            Arc::new(OpusVoiceCodec::default()),
        );

        let voice = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.handle(audio(26)).await })
        };
        // 语音交换先拿到锁并开始转写
        tokio::time::sleep(Duration::from_millis(20)).await;
        let typed = {
            let handler = handler.clone();
            tokio::spawn(async move { handler.handle(text(26, "typed")).await })
        };
        voice.await.unwrap().unwrap();
        typed.await.unwrap().unwrap();

        let session = store.get_or_create(ChatId::new(26)).await.unwrap();
        let memory = ConversationMemory::decode(session.conversation_memory().unwrap()).unwrap();
        let texts: Vec<&str> = memory.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["spoken", "spoken", "typed", "typed"]);
    }
}
