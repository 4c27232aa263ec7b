//! Conversation Commands - 对话交换

use crate::application::ports::AudioBuffer;
use crate::domain::conversation::ChatId;

/// 归一化后的用户输入
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationInput {
    Text(String),
    /// 已解码的语音，需要先转写
    Audio(AudioBuffer),
}

/// 处理一条用户消息
#[derive(Debug, Clone)]
pub struct HandleMessage {
    pub chat_id: ChatId,
    pub input: ConversationInput,
}

/// 一次成功的交换结果
#[derive(Debug, Clone)]
pub struct Exchange {
    pub response_text: String,
    pub response_audio: AudioBuffer,
    /// Ogg/Opus 编码的语音消息
    pub response_voice: Vec<u8>,
}
