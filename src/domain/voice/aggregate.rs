//! Voice Context - 音色目录

use serde::{Deserialize, Serialize};

use super::{Voice, VoiceError};

/// 内置音色目录
///
/// 不变量:
/// - 目录非空，第一项为新会话的默认音色
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    pub fn new(voices: Vec<Voice>) -> Result<Self, VoiceError> {
        if voices.is_empty() {
            return Err(VoiceError::EmptyCatalog);
        }
        Ok(Self { voices })
    }

    pub fn default_voice(&self) -> &Voice {
        &self.voices[0]
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}
