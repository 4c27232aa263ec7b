//! Voice Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("音色目录不能为空")]
    EmptyCatalog,

    #[error("音色序号越界: {index} (共 {len} 个)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("音色描述不能为空")]
    EmptyDescription,
}
