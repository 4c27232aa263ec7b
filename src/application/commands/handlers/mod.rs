//! Command Handlers 实现

mod conversation_handler;
mod voice_handlers;

pub use conversation_handler::*;
pub use voice_handlers::*;
