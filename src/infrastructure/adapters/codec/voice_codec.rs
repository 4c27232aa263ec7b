//! Voice Codec - 基于 opus/ogg/symphonia 的语音编解码器
//!
//! 支持：
//! - Ogg/Opus 解码与编码（Telegram 语音消息）
//! - WAV (PCM s16le) 解码与编码
//! - MP3 解码（部分 TTS 服务返回 MP3）

use ogg::writing::PacketWriter;
use ogg::PacketReader;
use opus::{Application, Channels, Decoder, Encoder};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioBuffer, Codec, CodecError, ContainerFormat, VoiceCodecPort};

/// Opus 内部采样率，granule position 和 pre-skip 都以它为单位
const OPUS_GRANULE_RATE: u32 = 48000;

/// 单个 Opus 包最多 120ms
const OPUS_MAX_FRAME_48K: usize = 5760;

/// 编码配置
#[derive(Debug, Clone)]
pub struct VoiceCodecConfig {
    /// Opus 目标比特率（bps），语音推荐 16000-64000
    pub bitrate: u32,
}

impl Default for VoiceCodecConfig {
    fn default() -> Self {
        Self {
            bitrate: 32000, // 32kbps，语音足够
        }
    }
}

/// 语音编解码器
///
/// 无内部可变状态，可在多个任务间共享
pub struct OpusVoiceCodec {
    config: VoiceCodecConfig,
}

/// OpusHead 中用到的字段 (RFC 7845 §5.1)
#[derive(Debug)]
struct OpusHead {
    channels: u8,
    pre_skip: u16,
    input_sample_rate: u32,
}

impl OpusVoiceCodec {
    pub fn new(config: VoiceCodecConfig) -> Self {
        Self { config }
    }

    /// 解析 OpusHead 包
    fn parse_opus_head(&self, data: &[u8]) -> Result<OpusHead, CodecError> {
        if data.len() < 19 || &data[0..8] != b"OpusHead" {
            return Err(CodecError::InvalidInput(
                "Invalid Ogg/Opus: missing OpusHead".to_string(),
            ));
        }

        let channels = data[9];
        if channels == 0 || channels > 2 {
            return Err(CodecError::InvalidInput(format!(
                "Unsupported Opus channel count: {}",
                channels
            )));
        }

        Ok(OpusHead {
            channels,
            pre_skip: u16::from_le_bytes([data[10], data[11]]),
            input_sample_rate: u32::from_le_bytes([data[12], data[13], data[14], data[15]]),
        })
    }

    /// 解码 Ogg/Opus 到 48kHz PCM
    fn decode_ogg_opus(&self, data: &[u8]) -> Result<AudioBuffer, CodecError> {
        let mut reader = PacketReader::new(Cursor::new(data));

        let head_packet = reader
            .read_packet()
            .map_err(|e| CodecError::DecodingError(format!("Ogg read error: {}", e)))?
            .ok_or_else(|| CodecError::InvalidInput("Empty Ogg stream".to_string()))?;
        let head = self.parse_opus_head(&head_packet.data)?;

        // 第二个包是 OpusTags，不需要内容
        let tags_packet = reader
            .read_packet()
            .map_err(|e| CodecError::DecodingError(format!("Ogg read error: {}", e)))?
            .ok_or_else(|| CodecError::InvalidInput("Missing OpusTags".to_string()))?;
        if !tags_packet.data.starts_with(b"OpusTags") {
            return Err(CodecError::InvalidInput(
                "Invalid Ogg/Opus: missing OpusTags".to_string(),
            ));
        }

        let channel_count = head.channels as usize;
        let channels = if head.channels == 1 {
            Channels::Mono
        } else {
            Channels::Stereo
        };
        let mut decoder = Decoder::new(OPUS_GRANULE_RATE, channels)
            .map_err(|e| CodecError::DecodingError(format!("Failed to create Opus decoder: {}", e)))?;

        let mut pcm: Vec<f32> = Vec::new();
        let mut output_buf = vec![0f32; OPUS_MAX_FRAME_48K * channel_count];
        let mut last_granule: u64 = 0;

        while let Some(packet) = reader
            .read_packet()
            .map_err(|e| CodecError::DecodingError(format!("Ogg read error: {}", e)))?
        {
            if packet.data.is_empty() {
                continue;
            }
            let frames = decoder
                .decode_float(&packet.data, &mut output_buf, false)
                .map_err(|e| CodecError::DecodingError(format!("Opus decode failed: {}", e)))?;
            pcm.extend_from_slice(&output_buf[..frames * channel_count]);
            last_granule = packet.absgp_page();
        }

        // 去掉编码器延迟 (pre-skip)
        let skip = (head.pre_skip as usize * channel_count).min(pcm.len());
        let mut samples = pcm.split_off(skip);

        // 按最后的 granule position 去掉末尾填充
        let pre_skip = head.pre_skip as u64;
        if last_granule > pre_skip {
            let valid = (last_granule - pre_skip) as usize * channel_count;
            if valid < samples.len() {
                samples.truncate(valid);
            }
        }

        tracing::debug!(
            channels = head.channels,
            pre_skip = head.pre_skip,
            input_sample_rate = head.input_sample_rate,
            samples = samples.len(),
            "Decoded Ogg/Opus"
        );

        Ok(AudioBuffer::new(samples, OPUS_GRANULE_RATE, head.channels))
    }

    /// 使用 symphonia 解码 WAV/MP3 获取 PCM 数据
    fn decode_with_symphonia(&self, data: &[u8], extension: &str) -> Result<AudioBuffer, CodecError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(extension);

        let format_opts = FormatOptions::default();
        let metadata_opts = MetadataOptions::default();

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &metadata_opts)
            .map_err(|e| CodecError::DecodingError(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;

        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u8);

        let decoder_opts = DecoderOptions::default();
        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &decoder_opts)
            .map_err(|e| CodecError::DecodingError(format!("Decoder creation failed: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let track_id = track.id;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(CodecError::DecodingError(format!(
                        "Packet read error: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
            };

            let spec = *decoded.spec();
            // MP3 的声道数/采样率在解出第一帧后才确定
            sample_rate.get_or_insert(spec.rate);
            channels.get_or_insert(spec.channels.count() as u8);

            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        let sample_rate = sample_rate
            .ok_or_else(|| CodecError::DecodingError("Unknown sample rate".to_string()))?;
        let channels =
            channels.ok_or_else(|| CodecError::DecodingError("Unknown channel count".to_string()))?;

        Ok(AudioBuffer::new(samples, sample_rate, channels))
    }

    /// 将 PCM f32 样本编码为 WAV
    fn encode_wav(&self, pcm: &AudioBuffer) -> Result<Vec<u8>, CodecError> {
        if pcm.channels == 0 || pcm.sample_rate == 0 {
            return Err(CodecError::InvalidInput(
                "Audio buffer has no channels or sample rate".to_string(),
            ));
        }

        let bits_per_sample: u16 = 16;
        let num_channels = pcm.channels as u16;
        let sample_rate = pcm.sample_rate;
        let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
        let block_align = num_channels * (bits_per_sample / 8);

        let data_size = pcm.samples.len() * 2;
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(44 + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());

        for sample in to_i16(&pcm.samples) {
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(wav)
    }

    /// 将 PCM f32 样本编码为 Opus (OGG 容器)
    fn encode_ogg_opus(&self, pcm: &AudioBuffer) -> Result<Vec<u8>, CodecError> {
        if pcm.channels == 0 || pcm.sample_rate == 0 {
            return Err(CodecError::InvalidInput(
                "Audio buffer has no channels or sample rate".to_string(),
            ));
        }

        // Opus 映射族 0 仅支持单声道或立体声，多声道先混成单声道
        let (samples, channel_count) = if pcm.channels > 2 {
            (downmix_to_mono(&pcm.samples, pcm.channels), 1usize)
        } else {
            (pcm.samples.clone(), pcm.channels as usize)
        };

        // Opus 支持的采样率: 8000, 12000, 16000, 24000, 48000
        let sample_rate = self.get_opus_compatible_sample_rate(pcm.sample_rate);
        let samples = self.resample(&samples, pcm.sample_rate, sample_rate, channel_count as u8);

        let channels = if channel_count == 1 {
            Channels::Mono
        } else {
            Channels::Stereo
        };

        // 创建 Opus 编码器 (Application::Voip 优化语音)
        let mut encoder = Encoder::new(sample_rate, channels, Application::Voip)
            .map_err(|e| CodecError::EncodingError(format!("Failed to create Opus encoder: {}", e)))?;

        encoder
            .set_bitrate(opus::Bitrate::Bits(self.config.bitrate as i32))
            .map_err(|e| CodecError::EncodingError(format!("Failed to set bitrate: {}", e)))?;

        // granule position 和 pre-skip 必须以 48kHz 计
        let granule_scale = (OPUS_GRANULE_RATE / sample_rate) as u64;
        let lookahead = encoder.get_lookahead().map(|l| l as u64).unwrap_or(312);
        let pre_skip_48k = lookahead * granule_scale;

        // 20ms 帧
        let frame_size = (sample_rate as usize * 20) / 1000;
        let samples_per_frame = frame_size * channel_count;
        let frame_granule = frame_size as u64 * granule_scale;

        // 末页 granule = pre-skip + 原始时长，解码端据此裁掉末尾填充
        let input_frames = (samples.len() / channel_count) as u64;
        let final_granule = pre_skip_48k + input_frames * granule_scale;

        // 需要足够多的帧把编码器延迟中的样本也刷出来
        let total_packets =
            ((input_frames + lookahead + frame_size as u64 - 1) / frame_size as u64).max(1) as usize;
        let mut pcm_i16 = to_i16(&samples);
        pcm_i16.resize(total_packets * samples_per_frame, 0);

        let mut ogg_data = Vec::new();
        {
            let mut packet_writer = PacketWriter::new(&mut ogg_data);
            let serial = 0;

            let opus_head =
                self.create_opus_head(channel_count as u8, pcm.sample_rate, pre_skip_48k as u16);
            packet_writer
                .write_packet(opus_head, serial, ogg::PacketWriteEndInfo::EndPage, 0)
                .map_err(|e| CodecError::EncodingError(format!("Failed to write Opus head: {}", e)))?;

            let opus_tags = self.create_opus_tags();
            packet_writer
                .write_packet(opus_tags, serial, ogg::PacketWriteEndInfo::EndPage, 0)
                .map_err(|e| CodecError::EncodingError(format!("Failed to write Opus tags: {}", e)))?;

            let mut output_buf = vec![0u8; 4000]; // Opus 最大包大小
            let mut granule_pos: u64 = 0;

            for (index, frame) in pcm_i16.chunks(samples_per_frame).enumerate() {
                let encoded_len = encoder
                    .encode(frame, &mut output_buf)
                    .map_err(|e| CodecError::EncodingError(format!("Opus encode failed: {}", e)))?;

                granule_pos = (granule_pos + frame_granule).min(final_granule);

                let end_info = if index + 1 == total_packets {
                    ogg::PacketWriteEndInfo::EndStream
                } else {
                    ogg::PacketWriteEndInfo::NormalPacket
                };

                packet_writer
                    .write_packet(
                        output_buf[..encoded_len].to_vec(),
                        serial,
                        end_info,
                        granule_pos,
                    )
                    .map_err(|e| CodecError::EncodingError(format!("Failed to write Opus packet: {}", e)))?;
            }
        }

        tracing::debug!(
            sample_rate = sample_rate,
            channels = channel_count,
            packets = total_packets,
            bytes = ogg_data.len(),
            "Encoded Ogg/Opus"
        );

        Ok(ogg_data)
    }

    /// 获取 Opus 兼容的采样率
    fn get_opus_compatible_sample_rate(&self, sample_rate: u32) -> u32 {
        match sample_rate {
            8000 | 12000 | 16000 | 24000 | 48000 => sample_rate,
            r if r <= 8000 => 8000,
            r if r <= 12000 => 12000,
            r if r <= 16000 => 16000,
            r if r <= 24000 => 24000,
            _ => 48000,
        }
    }

    /// 简单线性重采样
    fn resample(&self, samples: &[f32], from_rate: u32, to_rate: u32, channels: u8) -> Vec<f32> {
        if from_rate == to_rate || samples.is_empty() {
            return samples.to_vec();
        }

        let ratio = to_rate as f64 / from_rate as f64;
        let channel_count = channels as usize;
        let frame_count = samples.len() / channel_count;
        let new_frame_count = (frame_count as f64 * ratio) as usize;
        let mut resampled = Vec::with_capacity(new_frame_count * channel_count);

        for i in 0..new_frame_count {
            let src_pos = i as f64 / ratio;
            let src_idx = src_pos as usize;
            let frac = src_pos - src_idx as f64;

            for ch in 0..channel_count {
                let idx0 = src_idx * channel_count + ch;
                let idx1 = ((src_idx + 1).min(frame_count - 1)) * channel_count + ch;

                let s0 = samples.get(idx0).copied().unwrap_or(0.0);
                let s1 = samples.get(idx1).copied().unwrap_or(s0);

                // 线性插值
                resampled.push(s0 + (s1 - s0) * frac as f32);
            }
        }

        resampled
    }

    /// 创建 Opus Head 包 (RFC 7845)
    fn create_opus_head(&self, channels: u8, input_sample_rate: u32, pre_skip: u16) -> Vec<u8> {
        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead"); // Magic signature
        head.push(1); // Version
        head.push(channels); // Channel count
        head.extend_from_slice(&pre_skip.to_le_bytes()); // Pre-skip (48kHz)
        head.extend_from_slice(&input_sample_rate.to_le_bytes()); // Input sample rate
        head.extend_from_slice(&0i16.to_le_bytes()); // Output gain
        head.push(0); // Channel mapping family
        head
    }

    /// 创建 Opus Tags 包
    fn create_opus_tags(&self) -> Vec<u8> {
        let vendor = "voxrelay";
        let mut tags = Vec::new();
        tags.extend_from_slice(b"OpusTags");
        tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        tags.extend_from_slice(vendor.as_bytes());
        tags.extend_from_slice(&0u32.to_le_bytes()); // No user comments
        tags
    }
}

fn to_i16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
        .collect()
}

fn downmix_to_mono(samples: &[f32], channels: u8) -> Vec<f32> {
    let channel_count = channels as usize;
    samples
        .chunks(channel_count)
        .map(|frame| frame.iter().sum::<f32>() / channel_count as f32)
        .collect()
}

impl VoiceCodecPort for OpusVoiceCodec {
    fn decode(
        &self,
        data: &[u8],
        container: ContainerFormat,
        codec: Codec,
    ) -> Result<AudioBuffer, CodecError> {
        if !self.supports(container, codec) {
            return Err(CodecError::UnsupportedFormat { container, codec });
        }
        if data.is_empty() {
            return Err(CodecError::InvalidInput("Empty audio data".to_string()));
        }

        match (container, codec) {
            (ContainerFormat::Ogg, Codec::Opus) => self.decode_ogg_opus(data),
            (ContainerFormat::Wav, Codec::PcmS16Le) => self.decode_with_symphonia(data, "wav"),
            (ContainerFormat::Mp3, Codec::Mp3) => self.decode_with_symphonia(data, "mp3"),
            _ => Err(CodecError::UnsupportedFormat { container, codec }),
        }
    }

    fn encode(
        &self,
        audio: &AudioBuffer,
        container: ContainerFormat,
        codec: Codec,
    ) -> Result<Vec<u8>, CodecError> {
        match (container, codec) {
            (ContainerFormat::Ogg, Codec::Opus) => self.encode_ogg_opus(audio),
            (ContainerFormat::Wav, Codec::PcmS16Le) => self.encode_wav(audio),
            // MP3 只解码
            _ => Err(CodecError::UnsupportedFormat { container, codec }),
        }
    }

    fn supports(&self, container: ContainerFormat, codec: Codec) -> bool {
        matches!(
            (container, codec),
            (ContainerFormat::Ogg, Codec::Opus)
                | (ContainerFormat::Wav, Codec::PcmS16Le)
                | (ContainerFormat::Mp3, Codec::Mp3)
        )
    }
}

impl Default for OpusVoiceCodec {
    fn default() -> Self {
        Self::new(VoiceCodecConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 440Hz 正弦波
    fn sine(duration_ms: u32, sample_rate: u32, channels: u8) -> AudioBuffer {
        let frames = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
            for _ in 0..channels {
                samples.push(value);
            }
        }
        AudioBuffer::new(samples, sample_rate, channels)
    }

    #[test]
    fn test_ogg_opus_round_trip_keeps_duration() {
        let codec = OpusVoiceCodec::default();
        let original = sine(1000, 48000, 1);

        let encoded = codec
            .encode(&original, ContainerFormat::Ogg, Codec::Opus)
            .unwrap();
        assert_eq!(&encoded[0..4], b"OggS");

        let decoded = codec
            .decode(&encoded, ContainerFormat::Ogg, Codec::Opus)
            .unwrap();
        assert_eq!(decoded.channels, 1);
        let diff = decoded.duration_ms() as i64 - original.duration_ms() as i64;
        assert!(diff.abs() <= 20, "duration drifted by {}ms", diff);
    }

    #[test]
    fn test_ogg_opus_resamples_uncommon_rate() {
        let codec = OpusVoiceCodec::default();
        let original = sine(500, 22050, 1);

        let encoded = codec
            .encode(&original, ContainerFormat::Ogg, Codec::Opus)
            .unwrap();
        let decoded = codec
            .decode(&encoded, ContainerFormat::Ogg, Codec::Opus)
            .unwrap();

        assert_eq!(decoded.sample_rate, 48000);
        let diff = decoded.duration_ms() as i64 - 500;
        assert!(diff.abs() <= 20, "duration drifted by {}ms", diff);
    }

    #[test]
    fn test_ogg_opus_stereo() {
        let codec = OpusVoiceCodec::default();
        let original = sine(300, 24000, 2);

        let encoded = codec
            .encode(&original, ContainerFormat::Ogg, Codec::Opus)
            .unwrap();
        let decoded = codec
            .decode(&encoded, ContainerFormat::Ogg, Codec::Opus)
            .unwrap();
        assert_eq!(decoded.channels, 2);
    }

    #[test]
    fn test_wav_round_trip() {
        let codec = OpusVoiceCodec::default();
        let original = sine(250, 16000, 1);

        let wav = codec
            .encode(&original, ContainerFormat::Wav, Codec::PcmS16Le)
            .unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(wav.len(), 44 + original.samples.len() * 2);

        let decoded = codec
            .decode(&wav, ContainerFormat::Wav, Codec::PcmS16Le)
            .unwrap();
        assert_eq!(decoded.sample_rate, 16000);
        assert_eq!(decoded.samples.len(), original.samples.len());
        let max_error = decoded
            .samples
            .iter()
            .zip(&original.samples)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_error < 0.001);
    }

    #[test]
    fn test_unsupported_pairs() {
        let codec = OpusVoiceCodec::default();
        let audio = sine(100, 16000, 1);

        let result = codec.encode(&audio, ContainerFormat::Mp3, Codec::Mp3);
        assert!(matches!(result, Err(CodecError::UnsupportedFormat { .. })));

        let result = codec.decode(b"data", ContainerFormat::Wav, Codec::Opus);
        assert!(matches!(result, Err(CodecError::UnsupportedFormat { .. })));

        assert!(codec.supports(ContainerFormat::Mp3, Codec::Mp3));
        assert!(!codec.supports(ContainerFormat::Ogg, Codec::PcmS16Le));
    }

    #[test]
    fn test_decode_rejects_non_opus_ogg() {
        let codec = OpusVoiceCodec::default();
        let result = codec.decode(b"not an ogg stream", ContainerFormat::Ogg, Codec::Opus);
        assert!(result.is_err());
    }

    #[test]
    fn test_get_opus_compatible_sample_rate() {
        let codec = OpusVoiceCodec::default();
        assert_eq!(codec.get_opus_compatible_sample_rate(44100), 48000);
        assert_eq!(codec.get_opus_compatible_sample_rate(22050), 24000);
        assert_eq!(codec.get_opus_compatible_sample_rate(16000), 16000);
    }
}
