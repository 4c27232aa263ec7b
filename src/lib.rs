//! voxrelay - Telegram 语音对话中继
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Conversation Context: 会话、对话记忆、人设提示词
//! - Voice Context: 音色与音色目录
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SessionStore, Transcriber, Agent, Synthesizer, VoiceCodec, ChatPlatform）
//! - Commands: 对话交换与音色切换
//! - Queries: 音色列表与当前音色
//! - Dispatcher: 入站消息路由与回复
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: Telegram, OpenAI (Whisper + Chat Completions), TTS 服务商, Ogg/Opus 编解码
//! - Memory / Persistence: 内存与 Sled 会话存储
//! - Worker: long polling 与消息处理
//! - HTTP: webhook + 健康检查

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
