//! 测试用的端口替身

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::application::ports::{
    AgentConfig, AgentError, AgentFactoryPort, AgentPort, AudioBuffer, ChatPlatformPort, Codec,
    CodecError, ContainerFormat, PlatformError, SessionStorePort, StoreError, TranscribeError,
    TranscriberPort, VoiceCodecPort,
};
use crate::domain::conversation::{ChatId, ConversationMemory, Session};

/// 总是返回固定文本的转写器
pub struct ScriptedTranscriber {
    transcript: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedTranscriber {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// 每次转写前先等待
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriberPort for ScriptedTranscriber {
    async fn transcribe(&self, _audio: &AudioBuffer) -> Result<String, TranscribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.transcript.clone())
    }
}

/// 总是失败的转写器
#[derive(Default)]
pub struct FailingTranscriber {
    calls: AtomicUsize,
}

impl FailingTranscriber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriberPort for FailingTranscriber {
    async fn transcribe(&self, _audio: &AudioBuffer) -> Result<String, TranscribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TranscribeError::ServiceError("HTTP 503: whisper unavailable".into()))
    }
}

type Created = Arc<Mutex<Vec<(AgentConfig, ConversationMemory)>>>;

/// 原样回显输入的代理工厂，记录每次构造参数与收到的输入
#[derive(Default)]
pub struct EchoAgentFactory {
    created: Created,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl EchoAgentFactory {
    pub fn created(&self) -> Vec<(AgentConfig, ConversationMemory)> {
        self.created.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

impl AgentFactoryPort for EchoAgentFactory {
    fn create(&self, config: AgentConfig, memory: ConversationMemory) -> Box<dyn AgentPort> {
        self.created.lock().unwrap().push((config, memory.clone()));
        Box::new(EchoAgent {
            memory,
            inputs: self.inputs.clone(),
        })
    }
}

struct EchoAgent {
    memory: ConversationMemory,
    inputs: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl AgentPort for EchoAgent {
    async fn respond(&mut self, input: &str) -> Result<String, AgentError> {
        self.inputs.lock().unwrap().push(input.to_string());
        // 让出调度，给并发交换交错的机会
        tokio::task::yield_now().await;
        self.memory.push_human(input);
        self.memory.push_ai(input);
        Ok(input.to_string())
    }

    fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}

/// 代理推理总是失败的工厂
#[derive(Default)]
pub struct FailingAgentFactory {
    responds: Arc<AtomicUsize>,
}

impl FailingAgentFactory {
    /// 所有代理实例累计的 respond 调用次数
    pub fn responds(&self) -> usize {
        self.responds.load(Ordering::SeqCst)
    }
}

impl AgentFactoryPort for FailingAgentFactory {
    fn create(&self, _config: AgentConfig, memory: ConversationMemory) -> Box<dyn AgentPort> {
        Box::new(FailingAgent {
            memory,
            responds: self.responds.clone(),
        })
    }
}

struct FailingAgent {
    memory: ConversationMemory,
    responds: Arc<AtomicUsize>,
}

#[async_trait]
impl AgentPort for FailingAgent {
    async fn respond(&mut self, input: &str) -> Result<String, AgentError> {
        self.responds.fetch_add(1, Ordering::SeqCst);
        // 失败前已写入的输入不能被持久化
        self.memory.push_human(input);
        Err(AgentError::Timeout)
    }

    fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}

/// 在读或写时失败的会话存储，其余操作转发给内部存储
pub struct FailingSessionStore {
    inner: Arc<dyn SessionStorePort>,
    fail_reads: bool,
    reads: AtomicUsize,
    puts: AtomicUsize,
}

impl FailingSessionStore {
    /// `get_or_create` 失败
    pub fn on_read(inner: Arc<dyn SessionStorePort>) -> Self {
        Self {
            inner,
            fail_reads: true,
            reads: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }

    /// `put` 失败
    pub fn on_write(inner: Arc<dyn SessionStorePort>) -> Self {
        Self {
            fail_reads: false,
            ..Self::on_read(inner)
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionStorePort for FailingSessionStore {
    async fn get_or_create(&self, chat_id: ChatId) -> Result<Session, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.get_or_create(chat_id).await
    }

    async fn put(&self, _chat_id: ChatId, _session: Session) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("disk full".into()))
    }
}

/// 编码总是失败的编解码器
#[derive(Default)]
pub struct FailingEncoder {
    encodes: AtomicUsize,
}

impl FailingEncoder {
    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl VoiceCodecPort for FailingEncoder {
    fn decode(
        &self,
        _data: &[u8],
        container: ContainerFormat,
        codec: Codec,
    ) -> Result<AudioBuffer, CodecError> {
        Err(CodecError::UnsupportedFormat { container, codec })
    }

    fn encode(
        &self,
        _audio: &AudioBuffer,
        _container: ContainerFormat,
        _codec: Codec,
    ) -> Result<Vec<u8>, CodecError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        Err(CodecError::EncodingError("opus encoder rejected frame".into()))
    }

    fn supports(&self, _container: ContainerFormat, _codec: Codec) -> bool {
        true
    }
}

/// 平台收到的出站消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(String),
    Voice(Vec<u8>),
}

/// 记录出站消息的平台，下载总是返回预设的语音文件
pub struct RecordingPlatform {
    voice_file: Vec<u8>,
    sent: Mutex<Vec<Sent>>,
    downloads: Mutex<Vec<String>>,
}

impl RecordingPlatform {
    pub fn new(voice_file: Vec<u8>) -> Self {
        Self {
            voice_file,
            sent: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPlatformPort for RecordingPlatform {
    async fn send_text(&self, _chat_id: ChatId, text: &str) -> Result<(), PlatformError> {
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_voice(&self, _chat_id: ChatId, voice: Vec<u8>) -> Result<(), PlatformError> {
        self.sent.lock().unwrap().push(Sent::Voice(voice));
        Ok(())
    }

    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, PlatformError> {
        self.downloads.lock().unwrap().push(file_id.to_string());
        Ok(self.voice_file.clone())
    }
}
