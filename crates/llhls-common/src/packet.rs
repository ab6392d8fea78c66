//! Elementary stream packets.
//!
//! A [`Packet`] is either a video access unit or an audio frame. Payloads are
//! reference counted, so `clone()` is a shallow copy and several consumers can
//! hold the same packet without copying media bytes.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{AudioCodecParameters, VideoCodecParameters};

/// Fields shared by every packet kind.
#[derive(Debug, Clone)]
pub struct PacketBase {
    pub stream_index: u8,
    /// Presentation timestamp relative to the start of the stream.
    pub timestamp: Duration,
    pub duration: Duration,
    /// Wall-clock time the packet was captured.
    pub start_time: DateTime<Utc>,
    /// Source URL; identifies the rendition.
    pub source: Arc<str>,
    pub data: Bytes,
}

impl PacketBase {
    pub fn new(source: impl Into<Arc<str>>, data: Bytes) -> Self {
        Self {
            stream_index: 0,
            timestamp: Duration::ZERO,
            duration: Duration::ZERO,
            start_time: Utc::now(),
            source: source.into(),
            data,
        }
    }

    fn deep_clone(&self) -> Self {
        Self {
            data: Bytes::copy_from_slice(&self.data),
            ..self.clone()
        }
    }
}

/// A video access unit.
#[derive(Debug, Clone)]
pub struct VideoPacket {
    pub base: PacketBase,
    pub keyframe: bool,
    pub codec: Arc<VideoCodecParameters>,
}

/// An audio frame.
#[derive(Debug, Clone)]
pub struct AudioPacket {
    pub base: PacketBase,
    pub codec: Arc<AudioCodecParameters>,
}

/// A timestamped media packet.
#[derive(Debug, Clone)]
pub enum Packet {
    Video(VideoPacket),
    Audio(AudioPacket),
}

impl Packet {
    pub fn video(base: PacketBase, keyframe: bool, codec: Arc<VideoCodecParameters>) -> Self {
        Self::Video(VideoPacket {
            base,
            keyframe,
            codec,
        })
    }

    pub fn audio(base: PacketBase, codec: Arc<AudioCodecParameters>) -> Self {
        Self::Audio(AudioPacket { base, codec })
    }

    pub fn base(&self) -> &PacketBase {
        match self {
            Self::Video(p) => &p.base,
            Self::Audio(p) => &p.base,
        }
    }

    fn base_mut(&mut self) -> &mut PacketBase {
        match self {
            Self::Video(p) => &mut p.base,
            Self::Audio(p) => &mut p.base,
        }
    }

    pub fn timestamp(&self) -> Duration {
        self.base().timestamp
    }

    pub fn duration(&self) -> Duration {
        self.base().duration
    }

    pub fn source(&self) -> &str {
        &self.base().source
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.base().start_time
    }

    pub fn data(&self) -> &Bytes {
        &self.base().data
    }

    pub fn len(&self) -> usize {
        self.base().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base().data.is_empty()
    }

    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video(_))
    }

    /// True only for video keyframes.
    pub fn is_keyframe(&self) -> bool {
        matches!(self, Self::Video(VideoPacket { keyframe: true, .. }))
    }

    /// "video" or "audio".
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Video(_) => "video",
            Self::Audio(_) => "audio",
        }
    }

    pub fn set_timestamp(&mut self, timestamp: Duration) {
        self.base_mut().timestamp = timestamp;
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.base_mut().duration = duration;
    }

    /// Copy the packet. With `deep` the payload bytes are copied as well;
    /// otherwise the copy shares the payload buffer.
    pub fn clone_packet(&self, deep: bool) -> Self {
        if !deep {
            return self.clone();
        }
        match self {
            Self::Video(p) => Self::Video(VideoPacket {
                base: p.base.deep_clone(),
                keyframe: p.keyframe,
                codec: Arc::clone(&p.codec),
            }),
            Self::Audio(p) => Self::Audio(AudioPacket {
                base: p.base.deep_clone(),
                codec: Arc::clone(&p.codec),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_packet(keyframe: bool) -> Packet {
        let codec = Arc::new(VideoCodecParameters::h264(
            640,
            360,
            30,
            0,
            Bytes::from_static(&[1, 0x42, 0, 0x1E]),
        ));
        let mut base = PacketBase::new("rtsp://cam", Bytes::from_static(&[0, 0, 0, 1, 0x65]));
        base.duration = Duration::from_millis(33);
        Packet::video(base, keyframe, codec)
    }

    #[test]
    fn test_shallow_clone_shares_payload() {
        let p = video_packet(true);
        let c = p.clone_packet(false);
        assert_eq!(p.data().as_ptr(), c.data().as_ptr());
    }

    #[test]
    fn test_deep_clone_copies_payload() {
        let p = video_packet(true);
        let c = p.clone_packet(true);
        assert_ne!(p.data().as_ptr(), c.data().as_ptr());
        assert_eq!(p.data(), c.data());
        assert!(c.is_keyframe());
    }

    #[test]
    fn test_keyframe_only_for_video() {
        assert!(video_packet(true).is_keyframe());
        assert!(!video_packet(false).is_keyframe());

        let codec = Arc::new(AudioCodecParameters::aac(
            48_000,
            2,
            0,
            Bytes::from_static(&[0x11, 0x90]),
        ));
        let audio = Packet::audio(PacketBase::new("rtsp://cam", Bytes::from_static(&[1])), codec);
        assert!(!audio.is_keyframe());
        assert_eq!(audio.kind(), "audio");
    }

    #[test]
    fn test_fixups() {
        let mut p = video_packet(false);
        p.set_timestamp(Duration::from_secs(5));
        p.set_duration(Duration::from_millis(40));
        assert_eq!(p.timestamp(), Duration::from_secs(5));
        assert_eq!(p.duration(), Duration::from_millis(40));
        assert_eq!(p.source(), "rtsp://cam");
    }
}
