//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};

/// 合成音色
///
/// 三个字段都是可选的：
/// - `id`: 合成服务自己的音色标识（ElevenLabs voice_id、Azure voice_name 等）
/// - `name`: 展示名称
/// - `description`: 人设描述，会追加到系统提示词中
///
/// 构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl Voice {
    pub fn new(id: Option<String>, name: Option<String>, description: Option<String>) -> Self {
        Self {
            id: id.filter(|s| !s.is_empty()),
            name: name.filter(|s| !s.is_empty()),
            description: description.filter(|s| !s.is_empty()),
        }
    }

    /// 按服务商音色 ID 创建
    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Some(id.into()), Some(name.into()), None)
    }

    /// 仅有展示名称（使用服务商默认音色）
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(None, Some(name.into()), None)
    }

    /// 由人设描述生成的音色（`/create`）
    pub fn from_description(description: impl Into<String>) -> Self {
        Self::new(None, None, Some(description.into()))
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// 人设文本：description 优先于 name
    pub fn persona(&self) -> Option<&str> {
        self.description().or_else(|| self.name())
    }

    /// 用于 `/who` 的展示文本：name 优先于 description
    pub fn label(&self) -> &str {
        self.name().or_else(|| self.description()).unwrap_or("")
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name().unwrap_or(""))?;
        if let Some(description) = self.description() {
            write!(f, " - {}", description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_prefers_description() {
        let voice = Voice::new(None, Some("Bob".into()), Some("pirate".into()));
        assert_eq!(voice.persona(), Some("pirate"));
        assert_eq!(voice.label(), "Bob");
    }

    #[test]
    fn test_empty_strings_are_absent() {
        let voice = Voice::new(Some(String::new()), Some("Amy".into()), Some(String::new()));
        assert_eq!(voice.id(), None);
        assert_eq!(voice.description(), None);
        assert_eq!(voice.persona(), Some("Amy"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Voice::with_id("Brian", "Brian").to_string(), "Brian");
        assert_eq!(Voice::from_description("an old sailor").to_string(), " - an old sailor");
    }
}
