//! Conversation Context - 对话记忆
//!
//! 序列化格式（JSON，带版本号）:
//! ```json
//! {"version": 1, "turns": [{"role": "human", "text": "hi"}, {"role": "ai", "text": "hello"}]}
//! ```
//! 版本号不匹配、JSON 损坏或空数据都会确定性地返回 [`MemoryError`]

use serde::{Deserialize, Serialize};

use super::MemoryError;

/// 当前记忆格式版本
pub const MEMORY_FORMAT_VERSION: u32 = 1;

/// 发言方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
}

/// 一轮发言
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// 对话记忆：按时间顺序排列的发言
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push_human(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Human,
            text: text.into(),
        });
    }

    pub fn push_ai(&mut self, text: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Ai,
            text: text.into(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// 序列化为带版本的 JSON
    pub fn encode(&self) -> Result<Vec<u8>, MemoryError> {
        let envelope = Envelope {
            version: MEMORY_FORMAT_VERSION,
            turns: self.turns.clone(),
        };
        serde_json::to_vec(&envelope).map_err(|e| MemoryError::Malformed(e.to_string()))
    }

    /// 从序列化数据恢复
    pub fn decode(data: &[u8]) -> Result<Self, MemoryError> {
        if data.is_empty() {
            return Err(MemoryError::Empty);
        }

        // 先只读版本号，避免旧格式被当成字段缺失
        let header: VersionHeader =
            serde_json::from_slice(data).map_err(|e| MemoryError::Malformed(e.to_string()))?;
        if header.version != MEMORY_FORMAT_VERSION {
            return Err(MemoryError::UnsupportedVersion(header.version));
        }

        let envelope: Envelope =
            serde_json::from_slice(data).map_err(|e| MemoryError::Malformed(e.to_string()))?;
        Ok(Self {
            turns: envelope.turns,
        })
    }
}
