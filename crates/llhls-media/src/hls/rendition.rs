//! Live muxer for one rendition.
//!
//! Holds a bounded ring of segments, keeps the index playlist current and
//! serves blocking reads. Writes come from a single writer; readers only take
//! the read lock, and wait on segment/fragment close signals outside of it.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use llhls_common::{CodecParametersPair, Error, Packet, Result};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::deadline::Deadline;
use super::playlist;
use super::segment::Segment;
use super::signal::Signal;
use super::types::Variant;
use crate::fmp4::Fmp4Muxer;

/// Presentation timestamps wrap at one hour.
pub const MAX_TIMESTAMP: Duration = Duration::from_secs(3600);

/// Timing and retention of a rendition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionOptions {
    pub segment_duration: Duration,
    pub fragment_duration: Duration,
    /// Advertised `PART-TARGET`.
    pub part_target: Duration,
    /// Live segments kept before the oldest is evicted.
    pub segment_count: usize,
}

impl Default for RenditionOptions {
    fn default() -> Self {
        Self {
            segment_duration: Duration::from_secs(2),
            fragment_duration: Duration::from_millis(495),
            part_target: Duration::from_millis(500),
            segment_count: 6,
        }
    }
}

#[derive(Debug)]
struct RenditionState {
    segments: HashMap<u64, Segment>,
    /// Oldest first; the last one is current.
    live: VecDeque<u64>,
    current: u64,
    media_sequence: u64,
    manifest: String,
}

impl RenditionState {
    fn current(&self) -> &Segment {
        &self.segments[&self.current]
    }
}

#[derive(Debug)]
pub struct RenditionMuxer {
    params: CodecParametersPair,
    options: RenditionOptions,
    /// Track layout; cloned empty for every render.
    template: Fmp4Muxer,
    state: RwLock<RenditionState>,
    shutdown: CancellationToken,
}

impl RenditionMuxer {
    pub fn new(params: CodecParametersPair, options: RenditionOptions) -> Result<Self> {
        let template = Fmp4Muxer::new(&params)?;
        let segment_count = options.segment_count.max(1);
        let options = RenditionOptions {
            segment_count,
            ..options
        };

        let first = Segment::new(
            0,
            options.segment_duration,
            options.fragment_duration,
            template.has_video(),
            Utc::now(),
        );
        let mut state = RenditionState {
            segments: HashMap::from([(0, first)]),
            live: VecDeque::from([0]),
            current: 0,
            media_sequence: 0,
            manifest: String::new(),
        };
        state.manifest = render_manifest(&options, &state);

        info!(
            url = %params.url,
            codecs = %params.codecs(),
            segment_ms = options.segment_duration.as_millis() as u64,
            "rendition created"
        );

        Ok(Self {
            params,
            options,
            template,
            state: RwLock::new(state),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn params(&self) -> &CodecParametersPair {
        &self.params
    }

    pub fn options(&self) -> &RenditionOptions {
        &self.options
    }

    /// Route a packet into the current segment, rolling over and evicting as
    /// segments close. Invalid packets are rejected without touching state.
    pub fn write_packet(&self, packet: &Packet) -> Result<()> {
        if self.shutdown.is_cancelled() {
            return Err(Error::Closed);
        }
        if packet.is_empty() {
            return Err(Error::EmptyPacket(packet.source().to_string()));
        }
        if !self.template.accepts(packet) {
            return Err(Error::TrackMissing(packet.kind()));
        }

        let mut packet = packet.clone_packet(false);
        let ts = packet.timestamp();
        if ts >= MAX_TIMESTAMP {
            let wrapped = ts.as_nanos() % MAX_TIMESTAMP.as_nanos();
            packet.set_timestamp(Duration::from_nanos(wrapped as u64));
        }
        trace!(
            url = %self.params.url,
            kind = packet.kind(),
            ts_ms = packet.timestamp().as_millis() as u64,
            size = packet.len(),
            "write packet"
        );

        let mut guard = self.state.write();
        let state = &mut *guard;
        let current = state.current;
        let closed = match state.segments.get_mut(&current) {
            Some(segment) => segment.write_packet(packet),
            None => return Err(Error::not_found("segment", current)),
        };

        if closed {
            let next = current + 1;
            state.segments.insert(
                next,
                Segment::new(
                    next,
                    self.options.segment_duration,
                    self.options.fragment_duration,
                    self.template.has_video(),
                    Utc::now(),
                ),
            );
            state.live.push_back(next);
            state.current = next;

            while state.live.len() > self.options.segment_count {
                if let Some(oldest) = state.live.pop_front() {
                    state.segments.remove(&oldest);
                    state.media_sequence += 1;
                    debug!(
                        url = %self.params.url,
                        segment = oldest,
                        media_sequence = state.media_sequence,
                        "segment evicted"
                    );
                }
            }
        }

        state.manifest = render_manifest(&self.options, state);
        Ok(())
    }

    /// Current index playlist.
    pub fn index_manifest(&self) -> String {
        self.state.read().manifest.clone()
    }

    pub fn media_sequence(&self) -> u64 {
        self.state.read().media_sequence
    }

    pub fn current_segment_id(&self) -> u64 {
        self.state.read().current
    }

    /// Ids of the retained segments, oldest first.
    pub fn live_segment_ids(&self) -> Vec<u64> {
        self.state.read().live.iter().copied().collect()
    }

    /// Index playlist, blocking until it covers the requested segment (and
    /// part, if given). Without a segment the latest playlist is returned.
    pub async fn get_index_manifest(
        &self,
        segment: Option<u64>,
        part: Option<u32>,
        deadline: &Deadline,
    ) -> Result<String> {
        let Some(want) = segment else {
            return Ok(self.index_manifest());
        };

        loop {
            let signal = {
                let state = self.state.read();
                let current = state.current();
                if state.current > want {
                    return Ok(state.manifest.clone());
                }
                match part {
                    None if state.current == want => return Ok(state.manifest.clone()),
                    Some(p) if state.current == want => match current.fragment(p) {
                        Some(f) if f.is_closed() => return Ok(state.manifest.clone()),
                        Some(f) => f.finished(),
                        None => current.current_fragment().finished(),
                    },
                    // requested segment is still in the future
                    _ => current.finished(),
                }
            };
            self.wait(signal, deadline, "playlist").await?;
        }
    }

    /// `ftyp` + `moov` for this rendition's codecs.
    pub fn init_segment(&self) -> Bytes {
        self.template.init_segment()
    }

    /// Full segment payload, blocking until the segment closes.
    pub async fn get_segment(&self, id: u64, deadline: &Deadline) -> Result<Bytes> {
        loop {
            let signal = {
                let state = self.state.read();
                let segment = state
                    .segments
                    .get(&id)
                    .ok_or_else(|| Error::not_found("segment", id))?;
                if segment.is_closed() {
                    let packets = segment.packets();
                    drop(state);
                    return self.render(packets, sequence_number(id, 0));
                }
                segment.finished()
            };
            self.wait(signal, deadline, "segment").await?;
        }
    }

    /// Single fragment payload, blocking until the fragment exists and closes.
    pub async fn get_fragment(
        &self,
        segment_id: u64,
        fragment_id: u32,
        deadline: &Deadline,
    ) -> Result<Bytes> {
        loop {
            let signal = {
                let state = self.state.read();
                let segment = state
                    .segments
                    .get(&segment_id)
                    .ok_or_else(|| Error::not_found("segment", segment_id))?;
                match segment.fragment(fragment_id) {
                    Some(f) if f.is_closed() => {
                        let packets = f.packets().to_vec();
                        drop(state);
                        return self.render(packets, sequence_number(segment_id, fragment_id));
                    }
                    Some(f) => f.finished(),
                    None if segment.is_closed() => {
                        return Err(Error::not_found(
                            "fragment",
                            format!("{}/{}", segment_id, fragment_id),
                        ))
                    }
                    None => segment.current_fragment().finished(),
                }
            };
            self.wait(signal, deadline, "fragment").await?;
        }
    }

    /// Master playlist entry for this rendition pointing at `uri`.
    pub fn variant(&self, uri: String) -> Variant {
        Variant {
            bandwidth: self.params.bandwidth(),
            resolution: self.params.video.as_ref().map(|v| (v.width, v.height)),
            codecs: self.params.codecs(),
            uri,
        }
    }

    /// Tear the rendition down. Pending and future reads fail with
    /// [`Error::Closed`].
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            info!(url = %self.params.url, "rendition closed");
            self.shutdown.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn wait(&self, signal: Signal, deadline: &Deadline, what: &str) -> Result<()> {
        let closed = self.shutdown.clone();
        deadline
            .run(what, async move {
                tokio::select! {
                    _ = signal.fired() => Ok(()),
                    _ = closed.cancelled() => Err(Error::Closed),
                }
            })
            .await?
    }

    fn render(&self, packets: Vec<Packet>, sequence: u32) -> Result<Bytes> {
        let mut muxer = self.template.fresh();
        for packet in packets {
            if let Err(e) = muxer.write_packet(packet) {
                warn!(url = %self.params.url, error = %e, "dropping packet while rendering");
            }
        }
        Ok(muxer.fragment(sequence))
    }
}

impl Drop for RenditionMuxer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn render_manifest(options: &RenditionOptions, state: &RenditionState) -> String {
    let mut out = playlist::index_header(
        options.segment_duration,
        options.part_target,
        state.media_sequence,
    );
    for id in &state.live {
        if let Some(segment) = state.segments.get(id) {
            out.push_str(segment.manifest_entry());
        }
    }
    out
}

/// `mfhd` sequence number: 1-based, unique per (segment, fragment) as long
/// as a segment holds fewer than 1000 fragments.
fn sequence_number(segment_id: u64, fragment_id: u32) -> u32 {
    let seq = segment_id
        .saturating_mul(1000)
        .saturating_add(u64::from(fragment_id))
        .saturating_add(1);
    u32::try_from(seq).unwrap_or(u32::MAX)
}
