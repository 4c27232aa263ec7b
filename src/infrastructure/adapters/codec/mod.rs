//! Codec Adapter - 语音编解码实现

mod voice_codec;

pub use voice_codec::{OpusVoiceCodec, VoiceCodecConfig};
