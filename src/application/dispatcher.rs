//! Dispatcher - 入站消息路由
//!
//! 把平台无关的入站事件分发到命令、查询或对话交换，并负责所有面向用户的回复。
//! 无法识别的输入直接回复固定文本，不触碰会话存储。

use std::sync::Arc;
use thiserror::Error;

use crate::application::commands::handlers::{
    ConversationHandler, CreateVoiceHandler, SelectVoiceHandler,
};
use crate::application::commands::{ConversationInput, CreateVoice, HandleMessage, SelectVoice};
use crate::application::error::{ConversationError, VoiceCommandError};
use crate::application::ports::{
    ChatPlatformPort, Codec, ContainerFormat, PlatformError, SessionStorePort,
    SynthesizerCapabilities, VoiceCodecPort,
};
use crate::application::queries::handlers::{ListVoicesHandler, WhoAmIHandler};
use crate::application::queries::{ListVoices, WhoAmI};
use crate::domain::conversation::ChatId;
use crate::application::chat_locks::ChatLocks;

pub const START_TEXT: &str = "Hi! Send me a text or voice message and I will answer with text and voice. Use /help for more information.";

pub const HELP_TEXT: &str = "Send a text or voice message to chat with me.\n\
/voice <index> - switch to another voice (resets the conversation)\n\
/create <description> - create a voice from a description (resets the conversation)\n\
/list - list the available voices\n\
/who - show the current voice\n\
/help - show this message";

pub const UNKNOWN_COMMAND_TEXT: &str =
    "Sorry, I didn't understand that command. Use /help for more information.";

pub const REJECTION_TEXT: &str =
    "Sorry, I only respond to commands, voice, or text messages. Use /help for more information.";

pub const APOLOGY_TEXT: &str = "Sorry, something went wrong while handling your message. Please try again.";

/// 入站事件类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/name args...`
    Command { name: String, args: String },
    Text(String),
    Voice { file_id: String },
    /// 既不是命令、文本也不是语音
    Unsupported,
}

impl InboundEvent {
    /// 解析文本消息，`/` 开头的视为命令（忽略 `@botname` 后缀）
    pub fn from_text(text: &str) -> Self {
        let Some(rest) = text.strip_prefix('/') else {
            return InboundEvent::Text(text.to_string());
        };

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head);

        InboundEvent::Command {
            name: name.to_lowercase(),
            args: args.to_string(),
        }
    }
}

/// 平台无关的入站消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub event: InboundEvent,
}

/// 对话流水线内部错误
#[derive(Debug, Error)]
enum PipelineError {
    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error("Voice download failed: {0}")]
    Download(#[from] PlatformError),
}

/// 消息分发器
pub struct Dispatcher {
    platform: Arc<dyn ChatPlatformPort>,
    codec: Arc<dyn VoiceCodecPort>,
    conversation: Arc<ConversationHandler>,
    select_voice: SelectVoiceHandler,
    create_voice: CreateVoiceHandler,
    list_voices: ListVoicesHandler,
    who_am_i: WhoAmIHandler,
}

impl Dispatcher {
    pub fn new(
        platform: Arc<dyn ChatPlatformPort>,
        codec: Arc<dyn VoiceCodecPort>,
        conversation: Arc<ConversationHandler>,
        store: Arc<dyn SessionStorePort>,
        locks: Arc<ChatLocks>,
        capabilities: SynthesizerCapabilities,
    ) -> Self {
        Self {
            platform,
            codec,
            conversation,
            select_voice: SelectVoiceHandler::new(store.clone(), locks.clone()),
            create_voice: CreateVoiceHandler::new(store.clone(), locks, capabilities),
            list_voices: ListVoicesHandler::new(store.clone()),
            who_am_i: WhoAmIHandler::new(store),
        }
    }

    /// 处理一条入站消息
    ///
    /// 只有发送回复失败才返回错误，流水线失败会转为道歉回复
    pub async fn dispatch(&self, message: InboundMessage) -> Result<(), PlatformError> {
        let chat_id = message.chat_id;

        match message.event {
            InboundEvent::Command { name, args } => self.command(chat_id, &name, args).await,
            InboundEvent::Text(text) => {
                let result = self.converse(chat_id, ConversationInput::Text(text)).await;
                self.reply(chat_id, result).await
            }
            InboundEvent::Voice { file_id } => {
                let result = self.voice(chat_id, &file_id).await;
                self.reply(chat_id, result).await
            }
            InboundEvent::Unsupported => {
                tracing::debug!(chat_id = %chat_id, "Rejected unsupported message");
                self.platform.send_text(chat_id, REJECTION_TEXT).await
            }
        }
    }

    async fn command(&self, chat_id: ChatId, name: &str, args: String) -> Result<(), PlatformError> {
        tracing::debug!(chat_id = %chat_id, command = %name, "Command received");

        let text = match name {
            "start" => START_TEXT.to_string(),
            "help" => HELP_TEXT.to_string(),
            "voice" => match self.select_voice.handle(SelectVoice { chat_id, index: args }).await {
                Ok(voice) => format!(
                    "Voice changed to '{}'. Our conversation has been reset.",
                    voice.label()
                ),
                Err(e) => voice_error_text(chat_id, e),
            },
            "create" => match self
                .create_voice
                .handle(CreateVoice {
                    chat_id,
                    description: args,
                })
                .await
            {
                Ok(index) => format!(
                    "Created voice {}. Our conversation has been reset.",
                    index
                ),
                Err(e) => voice_error_text(chat_id, e),
            },
            "list" => match self.list_voices.handle(ListVoices { chat_id }).await {
                Ok(list) => list.to_string(),
                Err(e) => voice_error_text(chat_id, e),
            },
            "who" => match self.who_am_i.handle(WhoAmI { chat_id }).await {
                Ok(who) => who.to_string(),
                Err(e) => voice_error_text(chat_id, e),
            },
            _ => UNKNOWN_COMMAND_TEXT.to_string(),
        };

        self.platform.send_text(chat_id, &text).await
    }

    async fn voice(&self, chat_id: ChatId, file_id: &str) -> Result<(String, Vec<u8>), PipelineError> {
        let data = self.platform.download_voice(file_id).await?;
        let audio = self
            .codec
            .decode(&data, ContainerFormat::Ogg, Codec::Opus)
            .map_err(ConversationError::from)?;
        self.converse(chat_id, ConversationInput::Audio(audio)).await
    }

    /// 跑完整条流水线，返回回复文本和已编码的语音消息
    async fn converse(
        &self,
        chat_id: ChatId,
        input: ConversationInput,
    ) -> Result<(String, Vec<u8>), PipelineError> {
        let exchange = self
            .conversation
            .handle(HandleMessage { chat_id, input })
            .await?;
        Ok((exchange.response_text, exchange.response_voice))
    }

    async fn reply(
        &self,
        chat_id: ChatId,
        result: Result<(String, Vec<u8>), PipelineError>,
    ) -> Result<(), PlatformError> {
        match result {
            Ok((text, voice)) => {
                self.platform.send_text(chat_id, &text).await?;
                self.platform.send_voice(chat_id, voice).await
            }
            Err(e) => {
                tracing::error!(chat_id = %chat_id, error = %e, "Exchange aborted");
                self.platform.send_text(chat_id, APOLOGY_TEXT).await
            }
        }
    }
}

fn voice_error_text(chat_id: ChatId, err: VoiceCommandError) -> String {
    match err {
        VoiceCommandError::MissingArgument("index") => {
            "Usage: /voice <index>. Use /list to see the available voices.".to_string()
        }
        VoiceCommandError::MissingArgument(_) => "Usage: /create <description>".to_string(),
        VoiceCommandError::InvalidVoiceIndex(raw) => format!(
            "Sorry, '{}' is not a valid voice. Use /list to see the available voices.",
            raw
        ),
        VoiceCommandError::VoiceCreationUnsupported => {
            "Sorry, the current synthesizer cannot create voices from a description.".to_string()
        }
        VoiceCommandError::StorageUnavailable(e) => {
            tracing::error!(chat_id = %chat_id, error = %e, "Voice command failed");
            APOLOGY_TEXT.to_string()
        }
    }
}
