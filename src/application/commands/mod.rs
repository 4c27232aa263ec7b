//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：对话交换与音色切换

mod conversation_commands;
mod voice_commands;

pub mod handlers;

pub use conversation_commands::*;
pub use voice_commands::*;
