//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（会话存储、编解码、转写、代理、合成、聊天平台）
//! - commands: CQRS 命令及处理器（对话交换、音色切换）
//! - queries: CQRS 查询及处理器（音色列表、当前音色）
//! - dispatcher: 入站消息路由
//! - chat_locks: 按 chat 串行化会话读写
//! - error: 应用层错误定义

pub mod chat_locks;
pub mod commands;
pub mod dispatcher;
pub mod error;
pub mod ports;
pub mod queries;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use chat_locks::{ChatGuard, ChatLocks};

pub use commands::{
    handlers::{
        ConversationHandler, ConversationSettings, CorruptMemoryPolicy, CreateVoiceHandler,
        SelectVoiceHandler,
    },
    ConversationInput, CreateVoice, Exchange, HandleMessage, SelectVoice,
};

pub use dispatcher::{Dispatcher, InboundEvent, InboundMessage};

pub use error::{ConversationError, VoiceCommandError};

pub use queries::{
    handlers::{ListVoicesHandler, VoiceListResponse, WhoAmIHandler, WhoAmIResponse},
    ListVoices, WhoAmI,
};
