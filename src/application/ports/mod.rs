//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod agent;
mod chat_platform;
mod key_value_store;
mod session_store;
mod synthesizer;
mod transcriber;
mod voice_codec;

pub use agent::{AgentConfig, AgentError, AgentFactoryPort, AgentPort};
pub use chat_platform::{ChatPlatformPort, PlatformError};
pub use key_value_store::KeyValueStorePort;
pub use session_store::{SessionStorePort, StoreError};
pub use synthesizer::{
    SynthesisError, SynthesisRequest, SynthesizerCapabilities, SynthesizerPort, VoiceSelector,
};
pub use transcriber::{TranscribeError, TranscriberPort};
pub use voice_codec::{AudioBuffer, Codec, CodecError, ContainerFormat, VoiceCodecPort};
