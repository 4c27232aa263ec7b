//! Telegram Adapter - Bot API 客户端
//!
//! 入站：long polling (`getUpdates`) 或 webhook 推送的 `Update`
//! 出站：`sendMessage` / `sendVoice`，语音下载走 `getFile`

mod client;
mod types;

pub use client::{TelegramClient, TelegramConfig};
pub use types::{ApiResponse, Chat, Message, TelegramFile, Update, VoiceNote};
