//! Per elementary stream track accumulator.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use llhls_common::{AudioCodecParameters, Error, Packet, Result, VideoCodecParameters};

use super::boxes::{write_audio_trak, write_video_trak};
use super::clamp::{clamp_u31, clamp_u32, ticks};
use super::fragment::{Sample, Sidx, Traf, SAMPLE_NON_KEYFRAME, SAMPLE_NO_DEPENDENCIES};

/// Time scale of every video track.
pub const VIDEO_TIMESCALE: u32 = 90_000;

/// Static description of a track, derived once from codec parameters.
#[derive(Debug)]
pub(crate) struct TrackInfo {
    pub track_id: u32,
    pub timescale: u32,
    pub is_video: bool,
    /// Serialized `trak` box for the init segment.
    pub trak: Bytes,
}

/// Packets of the fragment being built for one track.
#[derive(Debug, Clone)]
pub(crate) struct Track {
    info: Arc<TrackInfo>,
    packets: Vec<Packet>,
    duration: Duration,
    data_size: u64,
}

impl Track {
    pub(crate) fn video(track_id: u32, params: &VideoCodecParameters) -> Result<Self> {
        let mut trak = BytesMut::new();
        write_video_trak(&mut trak, track_id, VIDEO_TIMESCALE, params)?;
        Ok(Self::with_info(TrackInfo {
            track_id,
            timescale: VIDEO_TIMESCALE,
            is_video: true,
            trak: trak.freeze(),
        }))
    }

    pub(crate) fn audio(track_id: u32, params: &AudioCodecParameters) -> Result<Self> {
        if params.sample_rate == 0 {
            return Err(Error::unsupported(format!("{} without sample rate", params.codec)));
        }
        let mut trak = BytesMut::new();
        write_audio_trak(&mut trak, track_id, params.sample_rate, params)?;
        Ok(Self::with_info(TrackInfo {
            track_id,
            timescale: params.sample_rate,
            is_video: false,
            trak: trak.freeze(),
        }))
    }

    fn with_info(info: TrackInfo) -> Self {
        Self {
            info: Arc::new(info),
            packets: Vec::new(),
            duration: Duration::ZERO,
            data_size: 0,
        }
    }

    pub(crate) fn info(&self) -> &TrackInfo {
        &self.info
    }

    /// An empty accumulator for the same track.
    pub(crate) fn fresh(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            packets: Vec::new(),
            duration: Duration::ZERO,
            data_size: 0,
        }
    }

    pub(crate) fn push(&mut self, packet: Packet) {
        self.duration += packet.duration();
        self.data_size += packet.len() as u64;
        self.packets.push(packet);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub(crate) fn data_size(&self) -> u64 {
        self.data_size
    }

    fn base_decode_time(&self) -> u64 {
        self.packets
            .first()
            .map_or(0, |p| ticks(p.timestamp(), self.info.timescale))
    }

    pub(crate) fn sidx(&self) -> Sidx {
        Sidx {
            reference_id: self.info.track_id,
            timescale: self.info.timescale,
            earliest_presentation_time: self.base_decode_time(),
            referenced_size: clamp_u31(self.data_size, "sidx referenced size"),
            subsegment_duration: clamp_u32(
                ticks(self.duration, self.info.timescale),
                "sidx subsegment duration",
            ),
        }
    }

    pub(crate) fn traf(&self) -> Traf {
        let timescale = self.info.timescale;
        let samples = self
            .packets
            .iter()
            .map(|p| Sample {
                duration: clamp_u32(ticks(p.duration(), timescale), "sample duration"),
                size: clamp_u32(p.len() as u64, "sample size"),
                flags: if p.is_keyframe() {
                    SAMPLE_NO_DEPENDENCIES
                } else {
                    SAMPLE_NON_KEYFRAME
                },
            })
            .collect();
        Traf::new(self.info.track_id, self.base_decode_time(), samples)
    }

    /// Hand the accumulated packets over and reset the accumulator.
    pub(crate) fn take(&mut self) -> Vec<Packet> {
        self.duration = Duration::ZERO;
        self.data_size = 0;
        std::mem::take(&mut self.packets)
    }
}
