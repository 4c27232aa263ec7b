//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod codec;
pub mod openai;
pub mod telegram;
pub mod tts;

pub use codec::*;
pub use openai::*;
pub use telegram::{TelegramClient, TelegramConfig};
pub use tts::*;
