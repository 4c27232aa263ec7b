//! TTS Adapter - 语音合成实现

mod fake_synthesizer;
mod http_synthesizer;
mod provider;

pub use fake_synthesizer::{FakeSynthesizer, FakeSynthesizerConfig};
pub use http_synthesizer::{HttpSynthesizer, HttpSynthesizerConfig};
pub use provider::SynthesizerProvider;
