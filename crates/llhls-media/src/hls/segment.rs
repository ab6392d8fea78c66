//! A segment: an ordered run of fragments.

use std::time::Duration;

use chrono::{DateTime, Utc};
use llhls_common::Packet;
use tracing::debug;

use super::fragment::Fragment;
use super::playlist;
use super::signal::Signal;

#[derive(Debug)]
pub(crate) struct Segment {
    id: u64,
    target_duration: Duration,
    fragment_duration: Duration,
    video_timed: bool,
    created_at: DateTime<Utc>,
    duration: Duration,
    /// Never empty; the last one is current.
    fragments: Vec<Fragment>,
    finished: Signal,
    /// Lines of closed fragments.
    closed_entries: String,
    manifest_entry: String,
}

impl Segment {
    pub(crate) fn new(
        id: u64,
        target_duration: Duration,
        fragment_duration: Duration,
        video_timed: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        let first = Fragment::new(id, 0, fragment_duration, video_timed);
        let manifest_entry = first.manifest_entry().to_string();
        Self {
            id,
            target_duration,
            fragment_duration,
            video_timed,
            created_at,
            duration: Duration::ZERO,
            fragments: vec![first],
            finished: Signal::new(),
            closed_entries: String::new(),
            manifest_entry,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.finished.is_fired()
    }

    pub(crate) fn finished(&self) -> Signal {
        self.finished.clone()
    }

    pub(crate) fn manifest_entry(&self) -> &str {
        &self.manifest_entry
    }

    pub(crate) fn current_fragment(&self) -> &Fragment {
        // `fragments` always holds at least the first fragment
        &self.fragments[self.fragments.len() - 1]
    }

    pub(crate) fn fragment(&self, id: u32) -> Option<&Fragment> {
        self.fragments.get(id as usize)
    }

    pub(crate) fn fragment_count(&self) -> usize {
        self.fragments.len()
    }

    /// Shallow copies of every packet in fragment order.
    pub(crate) fn packets(&self) -> Vec<Packet> {
        self.fragments
            .iter()
            .flat_map(|f| f.packets().iter().cloned())
            .collect()
    }

    /// Route a packet to the current fragment. Returns `true` when this
    /// packet closed the segment.
    pub(crate) fn write_packet(&mut self, packet: Packet) -> bool {
        debug_assert!(!self.is_closed(), "write to closed segment");

        let last = self.fragments.len() - 1;
        let fragment = &mut self.fragments[last];
        if !fragment.write_packet(packet) {
            return false;
        }

        self.duration += fragment.duration();
        self.closed_entries.push_str(fragment.manifest_entry());
        let next_id = fragment.id() + 1;

        if self.duration >= self.target_duration {
            self.manifest_entry = format!(
                "{}{}",
                self.closed_entries,
                playlist::segment_tail(self.id, self.created_at, self.duration)
            );
            if self.finished.fire() {
                debug!(
                    segment = self.id,
                    duration_ms = self.duration.as_millis() as u64,
                    fragments = self.fragments.len(),
                    "segment closed"
                );
            }
            return true;
        }

        let next = Fragment::new(self.id, next_id, self.fragment_duration, self.video_timed);
        self.manifest_entry = format!("{}{}", self.closed_entries, next.manifest_entry());
        self.fragments.push(next);
        false
    }
}
