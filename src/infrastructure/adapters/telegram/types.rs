//! Bot API 数据类型（只保留用到的字段）

use serde::{Deserialize, Serialize};

use crate::application::{InboundEvent, InboundMessage};
use crate::domain::conversation::ChatId;

/// Bot API 响应包装
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<VoiceNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceNote {
    pub file_id: String,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// `getFile` 结果
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Update {
    /// 转换为平台无关的入站消息
    ///
    /// 不含 message 的更新（编辑、回调等）返回 None
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let chat_id = ChatId::new(message.chat.id);

        let event = if let Some(voice) = message.voice {
            InboundEvent::Voice {
                file_id: voice.file_id,
            }
        } else if let Some(text) = message.text {
            InboundEvent::from_text(&text)
        } else {
            InboundEvent::Unsupported
        };

        Some(InboundMessage { chat_id, event })
    }
}
