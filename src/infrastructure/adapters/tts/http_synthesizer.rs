//! HTTP Synthesizer - 调用外部 TTS HTTP 服务
//!
//! 实现 SynthesizerPort trait，按服务商构造请求，
//! 响应音频（MP3 或 WAV）经 VoiceCodec 解码为 AudioBuffer

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use super::provider::SynthesizerProvider;
use crate::application::ports::{
    AudioBuffer, SynthesisError, SynthesisRequest, SynthesizerCapabilities, SynthesizerPort,
    VoiceCodecPort, VoiceSelector,
};

/// Google Translate TTS 单次请求的字符上限
const GTTS_MAX_CHARS: usize = 200;

/// ElevenLabs 合成路径，音色 ID 以路径参数传入
const ELEVENLABS_TTS_PATH: &str = "/v1/text-to-speech/{voice_id}";

/// HTTP Synthesizer 配置
#[derive(Debug, Clone)]
pub struct HttpSynthesizerConfig {
    pub provider: SynthesizerProvider,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpSynthesizerConfig {
    fn default() -> Self {
        Self {
            provider: SynthesizerProvider::default(),
            timeout_secs: 60,
        }
    }
}

impl HttpSynthesizerConfig {
    pub fn new(provider: SynthesizerProvider) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Coqui Studio 生成样本的响应
#[derive(Debug, Deserialize)]
struct CoquiSample {
    audio_url: String,
}

/// HTTP 语音合成器
pub struct HttpSynthesizer {
    client: Client,
    config: HttpSynthesizerConfig,
    codec: Arc<dyn VoiceCodecPort>,
}

impl HttpSynthesizer {
    pub fn new(
        config: HttpSynthesizerConfig,
        codec: Arc<dyn VoiceCodecPort>,
    ) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SynthesisError::NetworkError(e.to_string()))?;

        tracing::info!(
            provider = config.provider.name(),
            timeout_secs = config.timeout_secs,
            "HttpSynthesizer initialized"
        );

        Ok(Self {
            client,
            config,
            codec,
        })
    }

    pub fn provider(&self) -> &SynthesizerProvider {
        &self.config.provider
    }

    /// 构造发往服务商的请求
    ///
    /// 音色 ID 写入 `voice_attribute()` 指定的字段。
    /// gTTS 按长度切分为多个请求，其余服务商只有一个
    fn build_requests(&self, request: &SynthesisRequest) -> Vec<RequestBuilder> {
        let text = request.text.as_str();
        let attr = self.config.provider.voice_attribute();
        let voice_id = match &request.voice {
            VoiceSelector::Id(id) => Some(id.as_str()),
            _ => None,
        };

        match &self.config.provider {
            SynthesizerProvider::ElevenLabs {
                api_key,
                base_url,
                model_id,
            } => {
                let voice_id = voice_id.unwrap_or("21m00Tcm4TlvDq8ikWAM");
                let path = ELEVENLABS_TTS_PATH.replace(&format!("{{{}}}", attr), voice_id);
                vec![self
                    .client
                    .post(format!("{}{}", base_url, path))
                    .header("xi-api-key", api_key)
                    .header("accept", "audio/mpeg")
                    .json(&json!({ "text": text, "model_id": model_id }))]
            }
            SynthesizerProvider::PlayHt {
                api_key,
                user_id,
                base_url,
            } => vec![self
                .client
                .post(format!("{}/api/v2/tts/stream", base_url))
                .header("AUTHORIZATION", api_key)
                .header("X-USER-ID", user_id)
                .header("accept", "audio/mpeg")
                .json(&json!({
                    "text": text,
                    attr: voice_id.unwrap_or("larry"),
                    "output_format": "mp3",
                }))],
            SynthesizerProvider::StreamElements { base_url } => vec![self
                .client
                .get(format!("{}/kappa/v2/speech", base_url))
                .query(&[(attr, voice_id.unwrap_or("Brian")), ("text", text)])],
            SynthesizerProvider::Azure {
                api_key,
                region,
                endpoint,
            } => {
                let endpoint = endpoint
                    .clone()
                    .unwrap_or_else(|| format!("https://{}.tts.speech.microsoft.com", region));
                let ssml = azure_ssml(attr, voice_id.unwrap_or("en-US-JennyNeural"), text);
                vec![self
                    .client
                    .post(format!("{}/cognitiveservices/v1", endpoint))
                    .header("Ocp-Apim-Subscription-Key", api_key)
                    .header("Content-Type", "application/ssml+xml")
                    .header("X-Microsoft-OutputFormat", "riff-24khz-16bit-mono-pcm")
                    .body(ssml)]
            }
            SynthesizerProvider::Coqui {
                api_token,
                base_url,
            } => {
                let builder = match &request.voice {
                    VoiceSelector::Persona(prompt) => self
                        .client
                        .post(format!("{}/api/v2/samples/from-prompt/", base_url))
                        .json(&json!({ "prompt": prompt, "text": text })),
                    VoiceSelector::Id(id) => self
                        .client
                        .post(format!("{}/api/v2/samples", base_url))
                        .json(&json!({ attr: id, "text": text })),
                    VoiceSelector::Default => self
                        .client
                        .post(format!("{}/api/v2/samples", base_url))
                        .json(&json!({ "text": text })),
                };
                vec![builder.bearer_auth(api_token)]
            }
            SynthesizerProvider::CoquiTts { base_url } => {
                let mut query = vec![("text", text)];
                if let Some(speaker) = voice_id {
                    query.push((attr, speaker));
                }
                vec![self
                    .client
                    .get(format!("{}/api/tts", base_url))
                    .query(&query)]
            }
            SynthesizerProvider::Gtts { base_url } => {
                let lang = voice_id.unwrap_or("en");
                chunk_text(text, GTTS_MAX_CHARS)
                    .into_iter()
                    .map(|chunk| {
                        self.client
                            .get(format!("{}/translate_tts", base_url))
                            .query(&[
                                ("ie", "UTF-8"),
                                ("client", "tw-ob"),
                                (attr, lang),
                                ("q", chunk.as_str()),
                            ])
                    })
                    .collect()
            }
        }
    }

    /// 发送请求并读取响应体
    async fn fetch(&self, builder: RequestBuilder) -> Result<Vec<u8>, SynthesisError> {
        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::InvalidResponse(format!("Failed to read audio: {}", e)))?;
        Ok(bytes.to_vec())
    }

    /// Coqui Studio 先返回样本描述，再下载音频
    async fn fetch_coqui_audio(&self, body: &[u8]) -> Result<Vec<u8>, SynthesisError> {
        let sample: CoquiSample = serde_json::from_slice(body)
            .map_err(|e| SynthesisError::InvalidResponse(format!("Invalid Coqui sample: {}", e)))?;
        self.fetch(self.client.get(&sample.audio_url)).await
    }

    fn decode(&self, data: &[u8]) -> Result<AudioBuffer, SynthesisError> {
        let (container, codec) = self.config.provider.audio_format();
        self.codec
            .decode(data, container, codec)
            .map_err(|e| SynthesisError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SynthesizerPort for HttpSynthesizer {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<AudioBuffer, SynthesisError> {
        tracing::debug!(
            provider = self.config.provider.name(),
            text_len = request.text.len(),
            voice = ?request.voice,
            "Sending synthesis request"
        );

        let mut combined: Option<AudioBuffer> = None;

        for builder in self.build_requests(&request) {
            let mut body = self.fetch(builder).await?;
            if matches!(self.config.provider, SynthesizerProvider::Coqui { .. }) {
                body = self.fetch_coqui_audio(&body).await?;
            }

            let audio = self.decode(&body)?;
            combined = Some(match combined {
                None => audio,
                Some(mut acc) => {
                    if acc.sample_rate != audio.sample_rate || acc.channels != audio.channels {
                        return Err(SynthesisError::InvalidResponse(
                            "Audio chunks have mismatched formats".to_string(),
                        ));
                    }
                    acc.samples.extend(audio.samples);
                    acc
                }
            });
        }

        let audio = combined
            .ok_or_else(|| SynthesisError::InvalidResponse("No audio returned".to_string()))?;

        tracing::info!(
            provider = self.config.provider.name(),
            duration_ms = audio.duration_ms(),
            sample_rate = audio.sample_rate,
            "Synthesis completed"
        );

        Ok(audio)
    }

    fn capabilities(&self) -> SynthesizerCapabilities {
        self.config.provider.capabilities()
    }
}

fn map_reqwest_error(e: reqwest::Error) -> SynthesisError {
    if e.is_timeout() {
        SynthesisError::Timeout
    } else if e.is_connect() {
        SynthesisError::NetworkError(format!("Cannot connect to TTS service: {}", e))
    } else {
        SynthesisError::NetworkError(e.to_string())
    }
}

fn azure_ssml(attr: &str, voice_name: &str, text: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='en-US'><voice {}='{}'>{}</voice></speak>",
        attr,
        xml_escape(voice_name),
        xml_escape(text)
    )
}

fn xml_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 按空白切分文本，每段不超过 `max_chars` 个字符
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current.chars().count() + 1 + word_len
        };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
