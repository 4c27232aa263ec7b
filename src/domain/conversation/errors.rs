//! Conversation Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("对话记忆为空")]
    Empty,

    #[error("对话记忆格式错误: {0}")]
    Malformed(String),

    #[error("不支持的对话记忆版本: {0}")]
    UnsupportedVersion(u32),
}
