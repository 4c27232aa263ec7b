//! OpenAI Adapter - OpenAI 兼容接口（转写与对话补全）

mod chat_agent;
mod client;
mod whisper;

pub use chat_agent::{ChatCompletionAgent, ChatCompletionAgentFactory};
pub use client::OpenAiClientConfig;
pub use whisper::WhisperTranscriber;
