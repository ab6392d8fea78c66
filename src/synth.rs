//! Synthetic packet source used by `llhls simulate` and the tests.
//!
//! Each configured resolution becomes one source URL carrying an H.264 track
//! (and optionally AAC). Payloads are filler bytes with the right framing;
//! they are not decodable.

use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::Utc;
use llhls_common::{AudioCodecParameters, Packet, PacketBase, VideoCodecParameters};

use crate::config::SimulateConfig;

const AAC_SAMPLE_RATE: u32 = 48_000;
const AAC_FRAME_SAMPLES: u64 = 1024;

/// AudioSpecificConfig: AAC-LC, 48 kHz, stereo.
const AAC_ASC: &[u8] = &[0x11, 0x90];

#[derive(Debug)]
enum Kind {
    Video {
        codec: Arc<VideoCodecParameters>,
        gop: u64,
        frame_size: usize,
    },
    Audio {
        codec: Arc<AudioCodecParameters>,
    },
}

#[derive(Debug)]
struct Stream {
    url: Arc<str>,
    kind: Kind,
    frame_duration: Duration,
    index: u64,
}

impl Stream {
    fn next_timestamp(&self) -> Duration {
        match &self.kind {
            // exact sample clock so audio never drifts
            Kind::Audio { .. } => Duration::from_nanos(
                self.index * AAC_FRAME_SAMPLES * 1_000_000_000 / u64::from(AAC_SAMPLE_RATE),
            ),
            Kind::Video { .. } => self.frame_duration * self.index as u32,
        }
    }

    fn next_packet(&mut self) -> Packet {
        let mut base = PacketBase::new(Arc::clone(&self.url), Bytes::new());
        base.timestamp = self.next_timestamp();
        base.duration = self.frame_duration;
        base.start_time = Utc::now();
        base.stream_index = match self.kind {
            Kind::Video { .. } => 0,
            Kind::Audio { .. } => 1,
        };

        let packet = match &self.kind {
            Kind::Video {
                codec,
                gop,
                frame_size,
            } => {
                let keyframe = self.index % gop == 0;
                let size = if keyframe { frame_size * 4 } else { *frame_size };
                base.data = nal_unit(if keyframe { 0x65 } else { 0x41 }, size, self.index);
                Packet::video(base, keyframe, Arc::clone(codec))
            }
            Kind::Audio { codec } => {
                base.data = Bytes::from(vec![0x21; 96 + (self.index % 7) as usize]);
                Packet::audio(base, Arc::clone(codec))
            }
        };
        self.index += 1;
        packet
    }
}

/// Endless, timestamp ordered packets for every configured rendition.
#[derive(Debug)]
pub struct SyntheticSource {
    streams: Vec<Stream>,
}

impl SyntheticSource {
    pub fn new(config: &SimulateConfig) -> Self {
        let fps = config.fps.max(1);
        let gop = u64::from(config.gop.max(1));
        let mut streams = Vec::new();

        for &(width, height) in &config.resolutions {
            let url: Arc<str> = Arc::from(format!("synthetic://{}x{}", width, height));
            let pixels = u64::from(width) * u64::from(height);
            let codec = VideoCodecParameters::h264(width, height, fps, pixels * 2, avc_config());
            streams.push(Stream {
                url: Arc::clone(&url),
                kind: Kind::Video {
                    codec: Arc::new(codec),
                    gop,
                    frame_size: (pixels / 200).max(64) as usize,
                },
                frame_duration: Duration::from_secs(1) / fps,
                index: 0,
            });

            if config.audio {
                let codec = AudioCodecParameters::aac(
                    AAC_SAMPLE_RATE,
                    2,
                    128_000,
                    Bytes::from_static(AAC_ASC),
                );
                streams.push(Stream {
                    url,
                    kind: Kind::Audio {
                        codec: Arc::new(codec),
                    },
                    frame_duration: Duration::from_nanos(
                        AAC_FRAME_SAMPLES * 1_000_000_000 / u64::from(AAC_SAMPLE_RATE),
                    ),
                    index: 0,
                });
            }
        }

        Self { streams }
    }

    /// Source URLs in configuration order.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for stream in &self.streams {
            if urls.last().map(String::as_str) != Some(&*stream.url) {
                urls.push(stream.url.to_string());
            }
        }
        urls
    }

    /// All packets with a timestamp below `until`.
    pub fn take_until(&mut self, until: Duration) -> Vec<Packet> {
        let mut out = Vec::new();
        while let Some(stream) = self.earliest() {
            if stream.next_timestamp() >= until {
                break;
            }
            out.push(stream.next_packet());
        }
        out
    }

    fn earliest(&mut self) -> Option<&mut Stream> {
        self.streams.iter_mut().min_by_key(|s| s.next_timestamp())
    }
}

impl Iterator for SyntheticSource {
    type Item = Packet;

    fn next(&mut self) -> Option<Packet> {
        self.earliest().map(Stream::next_packet)
    }
}

/// avcC for High profile, level 3.1, with placeholder SPS/PPS.
fn avc_config() -> Bytes {
    let sps: &[u8] = &[0x67, 0x64, 0x00, 0x1F, 0xAC, 0xD9, 0x40, 0x50];
    let pps: &[u8] = &[0x68, 0xEB, 0xE3, 0xCB];

    let mut buf = BytesMut::with_capacity(16 + sps.len() + pps.len());
    buf.put_u8(1);
    buf.put_slice(&sps[1..4]);
    buf.put_u8(0xFF); // 4-byte NAL lengths
    buf.put_u8(0xE1); // one SPS
    buf.put_u16(sps.len() as u16);
    buf.put_slice(sps);
    buf.put_u8(1);
    buf.put_u16(pps.len() as u16);
    buf.put_slice(pps);
    buf.freeze()
}

/// Length-prefixed NAL unit of `size` bytes.
fn nal_unit(header: u8, size: usize, seed: u64) -> Bytes {
    let body = size.max(2) - 1;
    let mut buf = BytesMut::with_capacity(4 + size);
    buf.put_u32(size.max(2) as u32);
    buf.put_u8(header);
    buf.extend((0..body).map(|i| (seed as usize + i) as u8));
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(audio: bool) -> SimulateConfig {
        SimulateConfig {
            resolutions: vec![(640, 360)],
            fps: 25,
            gop: 25,
            audio,
        }
    }

    #[test]
    fn test_video_cadence_and_keyframes() {
        let mut source = SyntheticSource::new(&config(false));
        let packets = source.take_until(Duration::from_secs(2));
        assert_eq!(packets.len(), 50);
        assert!(packets[0].is_keyframe());
        assert!(!packets[1].is_keyframe());
        assert!(packets[25].is_keyframe());
        assert_eq!(packets[1].timestamp(), Duration::from_millis(40));
        assert!(packets.iter().all(|p| p.source() == "synthetic://640x360"));
    }

    #[test]
    fn test_interleaved_in_timestamp_order() {
        let mut source = SyntheticSource::new(&config(true));
        let packets = source.take_until(Duration::from_secs(1));
        assert!(packets.iter().any(|p| !p.is_video()));
        assert!(packets
            .windows(2)
            .all(|w| w[0].timestamp() <= w[1].timestamp()));
        assert_eq!(source.urls(), vec!["synthetic://640x360".to_string()]);
    }

    #[test]
    fn test_avc_config_profile() {
        let cfg = avc_config();
        assert_eq!(&cfg[1..4], &[0x64, 0x00, 0x1F]);
        let codec = VideoCodecParameters::h264(640, 360, 25, 0, cfg);
        assert_eq!(codec.tag(), "avc1.64001F");
    }

    #[test]
    fn test_nal_unit_framing() {
        let nal = nal_unit(0x65, 10, 0);
        assert_eq!(nal.len(), 14);
        assert_eq!(&nal[..4], &[0, 0, 0, 10]);
        assert_eq!(nal[4], 0x65);
    }
}
