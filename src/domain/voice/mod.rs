//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 音色值对象
//! - 内置音色目录

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::VoiceCatalog;
pub use errors::VoiceError;
pub use value_objects::Voice;
