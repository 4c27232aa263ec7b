//! Conversation Context - 人设提示词

use crate::domain::voice::Voice;

/// 根据音色生成人设补充文本
///
/// description 优先于 name；两者都没有时不补充
pub fn persona_augmentation(voice: &Voice) -> Option<String> {
    voice
        .persona()
        .map(|persona| format!("\nPretend to be {}.", persona))
}

/// 系统提示词 = 基础提示词 + 人设补充
pub fn effective_prompt(base_prompt: &str, voice: &Voice) -> String {
    match persona_augmentation(voice) {
        Some(augmentation) => format!("{}{}", base_prompt, augmentation),
        None => base_prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_wins_over_name() {
        let voice = Voice::new(None, Some("Bob".into()), Some("pirate".into()));
        let prompt = effective_prompt("Be helpful.", &voice);
        assert_eq!(prompt, "Be helpful.\nPretend to be pirate.");
        assert!(!prompt.contains("Bob"));
    }

    #[test]
    fn test_name_used_without_description() {
        let voice = Voice::named("Bob");
        assert_eq!(
            persona_augmentation(&voice).as_deref(),
            Some("\nPretend to be Bob.")
        );
    }

    #[test]
    fn test_no_persona() {
        let voice = Voice::new(Some("abc".into()), None, None);
        assert_eq!(effective_prompt("Be helpful.", &voice), "Be helpful.");
    }
}
