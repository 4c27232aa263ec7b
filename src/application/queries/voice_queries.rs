//! Voice Queries

use crate::domain::conversation::ChatId;

/// 列出当前 chat 可用音色（`/list`）
#[derive(Debug, Clone)]
pub struct ListVoices {
    pub chat_id: ChatId,
}

/// 查询当前音色（`/who`）
#[derive(Debug, Clone)]
pub struct WhoAmI {
    pub chat_id: ChatId,
}
