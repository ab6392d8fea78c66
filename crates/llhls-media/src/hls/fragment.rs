//! A fragment: one LL-HLS part.
//!
//! A fragment is open until its accumulated duration reaches the target. When
//! the rendition carries video only video packets count towards the duration,
//! so a fragment always closes on a video packet (which it still includes).
//! Audio-only renditions close purely on audio duration.

use std::time::Duration;

use llhls_common::Packet;
use tracing::debug;

use super::playlist;
use super::signal::Signal;

#[derive(Debug)]
pub(crate) struct Fragment {
    id: u32,
    segment_id: u64,
    target_duration: Duration,
    duration: Duration,
    independent: bool,
    /// Whether duration accrues from video packets only.
    video_timed: bool,
    packets: Vec<Packet>,
    finished: Signal,
    manifest_entry: String,
}

impl Fragment {
    pub(crate) fn new(segment_id: u64, id: u32, target_duration: Duration, video_timed: bool) -> Self {
        Self {
            id,
            segment_id,
            target_duration,
            duration: Duration::ZERO,
            independent: false,
            video_timed,
            packets: Vec::new(),
            finished: Signal::new(),
            manifest_entry: playlist::preload_hint(segment_id, id),
        }
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }

    pub(crate) fn is_independent(&self) -> bool {
        self.independent
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.finished.is_fired()
    }

    pub(crate) fn finished(&self) -> Signal {
        self.finished.clone()
    }

    /// Preload hint while open, part line once closed.
    pub(crate) fn manifest_entry(&self) -> &str {
        &self.manifest_entry
    }

    pub(crate) fn packets(&self) -> &[Packet] {
        &self.packets
    }

    /// Append a packet. Returns `true` when this packet closed the fragment.
    pub(crate) fn write_packet(&mut self, packet: Packet) -> bool {
        debug_assert!(!self.is_closed(), "write to closed fragment");

        let counts = match &packet {
            Packet::Video(v) => {
                if v.keyframe {
                    self.independent = true;
                }
                true
            }
            Packet::Audio(_) => !self.video_timed,
        };
        if counts {
            self.duration += packet.duration();
        }
        self.packets.push(packet);

        if counts && self.duration >= self.target_duration {
            self.close();
            return true;
        }
        false
    }

    fn close(&mut self) {
        self.manifest_entry =
            playlist::part(self.segment_id, self.id, self.duration, self.independent);
        if self.finished.fire() {
            debug!(
                segment = self.segment_id,
                fragment = self.id,
                duration_ms = self.duration.as_millis() as u64,
                independent = self.independent,
                packets = self.packets.len(),
                "fragment closed"
            );
        }
    }
}
