//! Codec parameters attached to every packet.
//!
//! Parameters are plain values: two updates carrying equal parameters compare
//! equal, which is how the writer recognizes "nothing changed".

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Elementary stream codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// H.264 / AVC video.
    H264,
    /// H.265 / HEVC video.
    H265,
    /// AAC audio.
    Aac,
    /// Opus audio.
    Opus,
    /// Raw PCM audio.
    Pcm,
    /// Motion JPEG video.
    Mjpeg,
}

impl CodecKind {
    /// Whether this is a video codec.
    pub fn is_video(self) -> bool {
        matches!(self, Self::H264 | Self::H265 | Self::Mjpeg)
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::H264 => "h264",
            Self::H265 => "h265",
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Pcm => "pcm",
            Self::Mjpeg => "mjpeg",
        };
        f.write_str(name)
    }
}

/// Video stream parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCodecParameters {
    pub codec: CodecKind,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Nominal bitrate in bits per second.
    pub bitrate: u64,
    /// Decoder configuration record (`avcC` / `hvcC` payload).
    pub decoder_config: Bytes,
}

impl VideoCodecParameters {
    /// H.264 parameters from an AVC decoder configuration record.
    pub fn h264(width: u32, height: u32, fps: u32, bitrate: u64, avcc: Bytes) -> Self {
        Self {
            codec: CodecKind::H264,
            width,
            height,
            fps,
            bitrate,
            decoder_config: avcc,
        }
    }

    /// H.265 parameters from an HEVC decoder configuration record.
    pub fn h265(width: u32, height: u32, fps: u32, bitrate: u64, hvcc: Bytes) -> Self {
        Self {
            codec: CodecKind::H265,
            width,
            height,
            fps,
            bitrate,
            decoder_config: hvcc,
        }
    }

    /// Pixel count, used to order renditions.
    pub fn resolution(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// RFC 6381 codec tag.
    pub fn tag(&self) -> String {
        let cfg = &self.decoder_config;
        match self.codec {
            CodecKind::H264 if cfg.len() >= 4 => {
                format!("avc1.{:02X}{:02X}{:02X}", cfg[1], cfg[2], cfg[3])
            }
            CodecKind::H264 => "avc1".to_string(),
            CodecKind::H265 if cfg.len() >= 13 => {
                format!("hev1.{:X}.{:X}.L{:02X}.90", cfg[1] & 0x1F, cfg[2], cfg[12])
            }
            CodecKind::H265 => "hev1".to_string(),
            other => other.to_string(),
        }
    }
}

/// Audio stream parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioCodecParameters {
    pub codec: CodecKind,
    pub sample_rate: u32,
    pub channels: u16,
    /// Nominal bitrate in bits per second.
    pub bitrate: u64,
    /// Codec specific configuration (AudioSpecificConfig for AAC).
    pub decoder_config: Bytes,
}

impl AudioCodecParameters {
    /// AAC parameters from an AudioSpecificConfig.
    pub fn aac(sample_rate: u32, channels: u16, bitrate: u64, asc: Bytes) -> Self {
        Self {
            codec: CodecKind::Aac,
            sample_rate,
            channels,
            bitrate,
            decoder_config: asc,
        }
    }

    /// MPEG-4 audio object type from the AudioSpecificConfig (2 = AAC-LC).
    pub fn object_type(&self) -> u8 {
        match self.decoder_config.first() {
            Some(b) if b >> 3 != 0 => b >> 3,
            _ => 2,
        }
    }

    /// RFC 6381 codec tag.
    pub fn tag(&self) -> String {
        match self.codec {
            CodecKind::Aac => format!("mp4a.40.{}", self.object_type()),
            other => other.to_string(),
        }
    }
}

/// The codec configuration of one rendition (one source URL).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecParametersPair {
    pub url: String,
    pub video: Option<Arc<VideoCodecParameters>>,
    pub audio: Option<Arc<AudioCodecParameters>>,
}

impl CodecParametersPair {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            video: None,
            audio: None,
        }
    }

    pub fn with_video(mut self, video: VideoCodecParameters) -> Self {
        self.video = Some(Arc::new(video));
        self
    }

    pub fn with_audio(mut self, audio: AudioCodecParameters) -> Self {
        self.audio = Some(Arc::new(audio));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }

    /// Pixel count of the video stream, 0 for audio-only renditions.
    pub fn resolution(&self) -> u64 {
        self.video.as_ref().map_or(0, |v| v.resolution())
    }

    /// Advertised bandwidth: the video bitrate, or the audio bitrate when
    /// there is no video.
    pub fn bandwidth(&self) -> u64 {
        match (&self.video, &self.audio) {
            (Some(v), _) => v.bitrate,
            (None, Some(a)) => a.bitrate,
            (None, None) => 0,
        }
    }

    /// Comma separated codec tags, video first.
    pub fn codecs(&self) -> String {
        let tags: Vec<String> = self
            .video
            .iter()
            .map(|v| v.tag())
            .chain(self.audio.iter().map(|a| a.tag()))
            .collect();
        tags.join(",")
    }
}
