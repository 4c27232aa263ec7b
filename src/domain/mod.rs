//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Conversation Context: 会话与对话记忆
//! - Voice Context: 音色与音色目录

pub mod conversation;
pub mod voice;
