//! Conversation Context - Session 聚合根

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::voice::{Voice, VoiceCatalog, VoiceError};

/// 每个聊天的会话
///
/// 不变量:
/// - `current_voice` 总是 `available_voices` 中的一项
/// - 切换音色会清空对话记忆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    available_voices: Vec<Voice>,
    current_voice: Voice,
    conversation_memory: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// 以音色目录创建默认会话
    pub fn new(catalog: &VoiceCatalog) -> Self {
        let now = Utc::now();
        Self {
            available_voices: catalog.voices().to_vec(),
            current_voice: catalog.default_voice().clone(),
            conversation_memory: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 按序号切换音色并重置对话
    pub fn select_voice(&mut self, index: usize) -> Result<&Voice, VoiceError> {
        let voice = self
            .available_voices
            .get(index)
            .cloned()
            .ok_or(VoiceError::IndexOutOfRange {
                index,
                len: self.available_voices.len(),
            })?;
        self.current_voice = voice;
        self.reset_memory();
        Ok(&self.current_voice)
    }

    /// 追加新音色并立即切换，返回其序号
    pub fn add_voice(&mut self, voice: Voice) -> usize {
        self.available_voices.push(voice.clone());
        self.current_voice = voice;
        self.reset_memory();
        self.available_voices.len() - 1
    }

    /// 保存序列化后的对话记忆
    pub fn record_memory(&mut self, memory: Vec<u8>) {
        self.conversation_memory = Some(memory);
        self.updated_at = Utc::now();
    }

    pub fn reset_memory(&mut self) {
        self.conversation_memory = None;
        self.updated_at = Utc::now();
    }

    // Getters
    pub fn available_voices(&self) -> &[Voice] {
        &self.available_voices
    }

    pub fn current_voice(&self) -> &Voice {
        &self.current_voice
    }

    pub fn conversation_memory(&self) -> Option<&[u8]> {
        self.conversation_memory.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> VoiceCatalog {
        VoiceCatalog::new(vec![Voice::with_id("Brian", "Brian"), Voice::with_id("Amy", "Amy")])
            .unwrap()
    }

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new(&catalog());
        assert_eq!(session.current_voice().name(), Some("Brian"));
        assert_eq!(session.available_voices().len(), 2);
        assert!(session.conversation_memory().is_none());
    }

    #[test]
    fn test_select_voice_resets_memory() {
        let mut session = Session::new(&catalog());
        session.record_memory(b"{}".to_vec());

        let voice = session.select_voice(1).unwrap();
        assert_eq!(voice.name(), Some("Amy"));
        assert!(session.conversation_memory().is_none());
    }

    #[test]
    fn test_select_voice_out_of_range() {
        let mut session = Session::new(&catalog());
        session.record_memory(b"{}".to_vec());

        let result = session.select_voice(2);
        assert_eq!(result, Err(VoiceError::IndexOutOfRange { index: 2, len: 2 }));
        // 失败时不改变状态
        assert_eq!(session.current_voice().name(), Some("Brian"));
        assert!(session.conversation_memory().is_some());
    }

    #[test]
    fn test_add_voice_selects_it() {
        let mut session = Session::new(&catalog());
        let index = session.add_voice(Voice::from_description("a grumpy pirate"));
        assert_eq!(index, 2);
        assert_eq!(session.current_voice().description(), Some("a grumpy pirate"));
        assert!(session.available_voices().contains(session.current_voice()));
    }
}
