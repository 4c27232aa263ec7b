//! Voice Commands - 切换与创建音色

use crate::domain::conversation::ChatId;

/// 选择音色命令（`/voice <index>`）
#[derive(Debug, Clone)]
pub struct SelectVoice {
    pub chat_id: ChatId,
    /// 原始参数，由处理器解析
    pub index: String,
}

/// 按人设描述创建音色命令（`/create <description>`）
#[derive(Debug, Clone)]
pub struct CreateVoice {
    pub chat_id: ChatId,
    pub description: String,
}
