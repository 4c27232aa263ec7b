//! 语音合成服务商
//!
//! 每个服务商携带自己的类型化配置，能力表和默认音色在这里静态给出

use serde::{Deserialize, Serialize};

use crate::application::ports::{Codec, ContainerFormat, SynthesizerCapabilities};
use crate::domain::voice::Voice;

/// 语音合成服务商配置
///
/// 在配置文件中以 `kind` 字段区分：
/// ```toml
/// [synthesizer.provider]
/// kind = "elevenlabs"
/// api_key = "..."
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SynthesizerProvider {
    #[serde(rename = "elevenlabs")]
    ElevenLabs {
        api_key: String,
        #[serde(default = "default_elevenlabs_url")]
        base_url: String,
        #[serde(default = "default_elevenlabs_model")]
        model_id: String,
    },

    #[serde(rename = "playht")]
    PlayHt {
        api_key: String,
        user_id: String,
        #[serde(default = "default_playht_url")]
        base_url: String,
    },

    StreamElements {
        #[serde(default = "default_streamelements_url")]
        base_url: String,
    },

    Azure {
        api_key: String,
        region: String,
        /// 覆盖 `https://{region}.tts.speech.microsoft.com`
        #[serde(default)]
        endpoint: Option<String>,
    },

    /// Coqui Studio，支持按人设描述生成音色
    Coqui {
        api_token: String,
        #[serde(default = "default_coqui_url")]
        base_url: String,
    },

    /// 本地 Coqui TTS 服务
    CoquiTts {
        #[serde(default = "default_coqui_tts_url")]
        base_url: String,
    },

    Gtts {
        #[serde(default = "default_gtts_url")]
        base_url: String,
    },
}

fn default_elevenlabs_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_elevenlabs_model() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_playht_url() -> String {
    "https://api.play.ht".to_string()
}

fn default_streamelements_url() -> String {
    "https://api.streamelements.com".to_string()
}

fn default_coqui_url() -> String {
    "https://app.coqui.ai".to_string()
}

fn default_coqui_tts_url() -> String {
    "http://localhost:5002".to_string()
}

fn default_gtts_url() -> String {
    "https://translate.google.com".to_string()
}

impl Default for SynthesizerProvider {
    fn default() -> Self {
        SynthesizerProvider::StreamElements {
            base_url: default_streamelements_url(),
        }
    }
}

impl SynthesizerProvider {
    pub fn name(&self) -> &'static str {
        match self {
            SynthesizerProvider::ElevenLabs { .. } => "elevenlabs",
            SynthesizerProvider::PlayHt { .. } => "playht",
            SynthesizerProvider::StreamElements { .. } => "stream_elements",
            SynthesizerProvider::Azure { .. } => "azure",
            SynthesizerProvider::Coqui { .. } => "coqui",
            SynthesizerProvider::CoquiTts { .. } => "coqui_tts",
            SynthesizerProvider::Gtts { .. } => "gtts",
        }
    }

    /// 服务商请求中携带音色 ID 的字段名
    ///
    /// 位置因服务商而异：ElevenLabs 为路径参数，PlayHT / Coqui Studio 为 JSON 字段，
    /// Azure 为 SSML `<voice>` 的属性，其余为 query 参数
    pub fn voice_attribute(&self) -> &'static str {
        match self {
            SynthesizerProvider::ElevenLabs { .. } | SynthesizerProvider::Coqui { .. } => {
                "voice_id"
            }
            SynthesizerProvider::PlayHt { .. } | SynthesizerProvider::StreamElements { .. } => {
                "voice"
            }
            SynthesizerProvider::Azure { .. } => "name",
            SynthesizerProvider::CoquiTts { .. } => "speaker_id",
            SynthesizerProvider::Gtts { .. } => "tl",
        }
    }

    pub fn capabilities(&self) -> SynthesizerCapabilities {
        SynthesizerCapabilities {
            persona_prompt: matches!(self, SynthesizerProvider::Coqui { .. }),
            voice_attribute: self.voice_attribute(),
        }
    }

    /// 服务商返回的音频格式
    pub fn audio_format(&self) -> (ContainerFormat, Codec) {
        match self {
            SynthesizerProvider::ElevenLabs { .. }
            | SynthesizerProvider::PlayHt { .. }
            | SynthesizerProvider::StreamElements { .. }
            | SynthesizerProvider::Gtts { .. } => (ContainerFormat::Mp3, Codec::Mp3),
            SynthesizerProvider::Azure { .. }
            | SynthesizerProvider::Coqui { .. }
            | SynthesizerProvider::CoquiTts { .. } => (ContainerFormat::Wav, Codec::PcmS16Le),
        }
    }

    /// 未配置音色目录时使用的默认音色
    pub fn default_voices(&self) -> Vec<Voice> {
        match self {
            SynthesizerProvider::ElevenLabs { .. } => vec![
                Voice::with_id("21m00Tcm4TlvDq8ikWAM", "Rachel"),
                Voice::with_id("AZnzlk1XvdvUeBnXmlld", "Domi"),
                Voice::with_id("EXAVITQu4vr4xnSDxMaL", "Bella"),
            ],
            SynthesizerProvider::PlayHt { .. } => vec![
                Voice::with_id("larry", "Larry"),
                Voice::with_id("susan", "Susan"),
            ],
            SynthesizerProvider::StreamElements { .. } => vec![
                Voice::with_id("Brian", "Brian"),
                Voice::with_id("Amy", "Amy"),
                Voice::with_id("Emma", "Emma"),
            ],
            SynthesizerProvider::Azure { .. } => vec![
                Voice::with_id("en-US-JennyNeural", "Jenny"),
                Voice::with_id("en-US-SteffanNeural", "Steffan"),
            ],
            SynthesizerProvider::Coqui { .. } => vec![Voice::named("Coqui Default")],
            SynthesizerProvider::CoquiTts { .. } => vec![Voice::named("Default")],
            SynthesizerProvider::Gtts { .. } => vec![
                Voice::with_id("en", "English"),
                Voice::with_id("fr", "French"),
            ],
        }
    }

    /// 去掉密钥后的副本，用于打印配置
    pub fn redacted(&self) -> Self {
        const REDACTED: &str = "***";
        let mut provider = self.clone();
        match &mut provider {
            SynthesizerProvider::ElevenLabs { api_key, .. }
            | SynthesizerProvider::PlayHt { api_key, .. }
            | SynthesizerProvider::Azure { api_key, .. } => *api_key = REDACTED.to_string(),
            SynthesizerProvider::Coqui { api_token, .. } => *api_token = REDACTED.to_string(),
            _ => {}
        }
        provider
    }

    /// 校验必填密钥
    pub fn validate(&self) -> Result<(), String> {
        let missing = match self {
            SynthesizerProvider::ElevenLabs { api_key, .. } if api_key.is_empty() => {
                Some("api_key")
            }
            SynthesizerProvider::PlayHt { api_key, .. } if api_key.is_empty() => Some("api_key"),
            SynthesizerProvider::PlayHt { user_id, .. } if user_id.is_empty() => Some("user_id"),
            SynthesizerProvider::Azure { api_key, .. } if api_key.is_empty() => Some("api_key"),
            SynthesizerProvider::Azure { region, .. } if region.is_empty() => Some("region"),
            SynthesizerProvider::Coqui { api_token, .. } if api_token.is_empty() => {
                Some("api_token")
            }
            _ => None,
        };
        match missing {
            Some(field) => Err(format!(
                "synthesizer.provider.{} is required for {}",
                field,
                self.name()
            )),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_coqui_supports_persona() {
        let coqui = SynthesizerProvider::Coqui {
            api_token: "t".into(),
            base_url: default_coqui_url(),
        };
        assert!(coqui.capabilities().persona_prompt);
        assert!(!SynthesizerProvider::default().capabilities().persona_prompt);
    }

    #[test]
    fn test_voice_attribute_table() {
        let azure = SynthesizerProvider::Azure {
            api_key: "k".into(),
            region: "eastus".into(),
            endpoint: None,
        };
        assert_eq!(azure.voice_attribute(), "name");
        assert_eq!(azure.capabilities().voice_attribute, "name");
        assert_eq!(
            SynthesizerProvider::CoquiTts {
                base_url: default_coqui_tts_url()
            }
            .voice_attribute(),
            "speaker_id"
        );
        assert_eq!(
            SynthesizerProvider::Gtts {
                base_url: default_gtts_url()
            }
            .voice_attribute(),
            "tl"
        );
    }

    #[test]
    fn test_deserialize_tagged() {
        let json = r#"{"kind":"elevenlabs","api_key":"secret"}"#;
        let provider: SynthesizerProvider = serde_json::from_str(json).unwrap();
        match &provider {
            SynthesizerProvider::ElevenLabs {
                api_key, base_url, ..
            } => {
                assert_eq!(api_key, "secret");
                assert_eq!(base_url, "https://api.elevenlabs.io");
            }
            other => panic!("unexpected provider: {:?}", other),
        }

        let json = r#"{"kind":"coqui_tts"}"#;
        let provider: SynthesizerProvider = serde_json::from_str(json).unwrap();
        assert_eq!(provider.name(), "coqui_tts");
    }

    #[test]
    fn test_redacted_hides_key() {
        let provider = SynthesizerProvider::PlayHt {
            api_key: "secret".into(),
            user_id: "user".into(),
            base_url: default_playht_url(),
        };
        let redacted = format!("{:?}", provider.redacted());
        assert!(!redacted.contains("secret"));
        assert!(redacted.contains("user"));
    }

    #[test]
    fn test_validate_missing_key() {
        let provider = SynthesizerProvider::Azure {
            api_key: String::new(),
            region: "eastus".into(),
            endpoint: None,
        };
        assert!(provider.validate().is_err());
        assert!(SynthesizerProvider::default().validate().is_ok());
    }

    #[test]
    fn test_default_voices_not_empty() {
        for provider in [
            SynthesizerProvider::default(),
            SynthesizerProvider::CoquiTts {
                base_url: default_coqui_tts_url(),
            },
        ] {
            assert!(!provider.default_voices().is_empty());
        }
    }
}
