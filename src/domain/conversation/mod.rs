//! Conversation Context - 对话限界上下文
//!
//! 职责:
//! - 每个聊天的 Session 聚合
//! - 对话记忆及其版本化序列化格式
//! - 人设提示词拼接

mod aggregate;
mod errors;
mod memory;
mod persona;
mod value_objects;

pub use aggregate::Session;
pub use errors::MemoryError;
pub use memory::{ConversationMemory, Role, Turn, MEMORY_FORMAT_VERSION};
pub use persona::{effective_prompt, persona_augmentation};
pub use value_objects::ChatId;
