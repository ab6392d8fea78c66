//! Fan-out of packets to one rendition muxer per source URL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use llhls_common::{CodecParametersPair, Error, Packet, Result};
use llhls_media::hls::INDEX_FILE;
use llhls_media::{generate_master_playlist, MasterPlaylist, RenditionMuxer, RenditionOptions};
use tracing::{info, warn};

/// Renditions keyed by source URL, ordered by ascending resolution.
#[derive(Debug)]
pub struct MultiRenditionWriter {
    writer_id: u32,
    options: RenditionOptions,
    muxers: HashMap<String, Arc<RenditionMuxer>>,
    params: HashMap<String, CodecParametersPair>,
    /// URLs with a usable muxer; the position is the rendition index.
    sorted_urls: Vec<String>,
    master: String,
}

impl MultiRenditionWriter {
    pub fn new(writer_id: u32, options: RenditionOptions) -> Self {
        let mut writer = Self {
            writer_id,
            options,
            muxers: HashMap::new(),
            params: HashMap::new(),
            sorted_urls: Vec::new(),
            master: String::new(),
        };
        writer.refresh();
        writer
    }

    pub fn writer_id(&self) -> u32 {
        self.writer_id
    }

    /// Number of renditions listed in the master playlist.
    pub fn len(&self) -> usize {
        self.sorted_urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_urls.is_empty()
    }

    /// Route a packet to its rendition, (re)creating the rendition when the
    /// packet's codec parameters are new for its source.
    pub fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.route(packet)?.write_packet(packet)
    }

    /// Bring the packet's rendition up to date with the packet's codec
    /// parameters and return it. The packet itself is not written.
    pub fn route(&mut self, packet: &Packet) -> Result<Arc<RenditionMuxer>> {
        let url = packet.source();
        let existing = self.params.get(url);

        let mut pair = existing
            .cloned()
            .unwrap_or_else(|| CodecParametersPair::new(url));
        match packet {
            Packet::Video(v) => pair.video = Some(Arc::clone(&v.codec)),
            Packet::Audio(a) => pair.audio = Some(Arc::clone(&a.codec)),
        }

        if existing == Some(&pair) {
            return self
                .muxers
                .get(url)
                .cloned()
                .ok_or_else(|| Error::RenditionUnavailable(url.to_string()));
        }

        self.update_codec_parameters(pair)
    }

    fn update_codec_parameters(&mut self, pair: CodecParametersPair) -> Result<Arc<RenditionMuxer>> {
        let url = pair.url.clone();
        if let Some(old) = self.muxers.remove(&url) {
            info!(url = %url, "codec parameters changed, recreating rendition");
            old.close();
        }
        self.params.insert(url.clone(), pair.clone());

        let result = RenditionMuxer::new(pair, self.options.clone()).map(Arc::new);
        match &result {
            Ok(muxer) => {
                self.muxers.insert(url.clone(), Arc::clone(muxer));
            }
            Err(e) => warn!(url = %url, error = %e, "rendition unavailable"),
        }
        self.refresh();
        result
    }

    /// Drop a source and its rendition. Returns whether it existed.
    pub fn remove_source(&mut self, url: &str) -> bool {
        let known = self.params.remove(url).is_some();
        if let Some(muxer) = self.muxers.remove(url) {
            muxer.close();
        }
        if known {
            info!(url = %url, "source removed");
            self.refresh();
        }
        known
    }

    /// Segment duration for renditions created from now on.
    pub fn set_segment_duration(&mut self, duration: Duration) {
        self.options.segment_duration = duration;
        if self.options.fragment_duration > duration {
            self.options.fragment_duration = duration;
        }
    }

    pub fn options(&self) -> &RenditionOptions {
        &self.options
    }

    pub fn master_playlist(&self) -> &str {
        &self.master
    }

    pub fn rendition(&self, index: usize) -> Result<Arc<RenditionMuxer>> {
        self.sorted_urls
            .get(index)
            .and_then(|url| self.muxers.get(url))
            .cloned()
            .ok_or_else(|| Error::not_found("rendition", index))
    }

    pub fn rendition_for(&self, url: &str) -> Option<Arc<RenditionMuxer>> {
        self.muxers.get(url).cloned()
    }

    /// Close every rendition.
    pub fn close(&mut self) {
        for muxer in self.muxers.values() {
            muxer.close();
        }
    }

    fn refresh(&mut self) {
        let mut urls: Vec<String> = self.muxers.keys().cloned().collect();
        // stable over the previous order so equal resolutions keep their index
        urls.sort_by_key(|url| {
            self.sorted_urls
                .iter()
                .position(|u| u == url)
                .unwrap_or(usize::MAX)
        });
        urls.sort_by_key(|url| self.params.get(url).map_or(0, |p| p.resolution()));
        self.sorted_urls = urls;

        let variants = self
            .sorted_urls
            .iter()
            .enumerate()
            .filter_map(|(index, url)| {
                let uri = format!("{}/{}/{}", self.writer_id, index, INDEX_FILE);
                self.muxers.get(url).map(|m| m.variant(uri))
            })
            .collect();
        self.master = generate_master_playlist(&MasterPlaylist { variants });
    }
}

impl Drop for MultiRenditionWriter {
    fn drop(&mut self) {
        self.close();
    }
}
