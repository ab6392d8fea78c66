//! The packet writer and the read handle shared by request handlers.
//!
//! Packets are queued to a single [`WriterWorker`] task that fans them out to
//! per-source renditions. [`HlsStreamer`] is the cloneable handle used both to
//! queue packets and to serve playlists and media.

mod renditions;
mod worker;

pub use renditions::MultiRenditionWriter;
pub use worker::WriterWorker;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use llhls_common::{Error, Packet, Result};
use llhls_media::{Deadline, RenditionMuxer, RenditionOptions};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::HlsConfig;
use crate::lifecycle;

/// Work queued to the writer task.
#[derive(Debug)]
pub enum WriterCommand {
    Packet(Packet),
    RemoveSource(String),
    SegmentDuration(Duration),
    /// Acknowledged once every earlier command has been applied.
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Clone)]
pub struct HlsStreamer {
    commands: mpsc::Sender<WriterCommand>,
    writer: Arc<RwLock<MultiRenditionWriter>>,
    stop: CancellationToken,
    read_timeout: Duration,
}

impl HlsStreamer {
    /// Spawn the writer task. It runs until `stop` is cancelled or every
    /// handle is dropped.
    pub fn start(config: &HlsConfig, stop: CancellationToken) -> (Self, JoinHandle<()>) {
        Self::with_options(
            config.writer_id,
            config.rendition_options(),
            config.channel_size,
            config.read_timeout(),
            stop,
        )
    }

    pub fn with_options(
        writer_id: u32,
        options: RenditionOptions,
        channel_size: usize,
        read_timeout: Duration,
        stop: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(channel_size.max(1));
        let writer = Arc::new(RwLock::new(MultiRenditionWriter::new(writer_id, options)));
        let handle = lifecycle::spawn(WriterWorker::new(rx, Arc::clone(&writer)), stop.clone());
        let streamer = Self {
            commands: tx,
            writer,
            stop,
            read_timeout,
        };
        (streamer, handle)
    }

    async fn send(&self, command: WriterCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| Error::Closed)
    }

    /// Queue a packet. Errors from the packet itself are logged by the writer.
    pub async fn write_packet(&self, packet: Packet) -> Result<()> {
        self.send(WriterCommand::Packet(packet)).await
    }

    pub async fn remove_source(&self, url: impl Into<String>) -> Result<()> {
        self.send(WriterCommand::RemoveSource(url.into())).await
    }

    /// Segment duration of renditions created after this call.
    pub async fn set_segment_duration(&self, duration: Duration) -> Result<()> {
        self.send(WriterCommand::SegmentDuration(duration)).await
    }

    /// Wait until everything queued so far has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(WriterCommand::Flush(tx)).await?;
        rx.await.map_err(|_| Error::Closed)
    }

    /// A deadline bounded by the read timeout and the writer's stop token.
    pub fn deadline(&self) -> Deadline {
        Deadline::new(self.stop.child_token()).with_timeout(self.read_timeout)
    }

    pub fn writer_id(&self) -> u32 {
        self.writer.read().writer_id()
    }

    pub fn master_playlist(&self) -> String {
        self.writer.read().master_playlist().to_string()
    }

    pub fn rendition_count(&self) -> usize {
        self.writer.read().len()
    }

    pub fn rendition(&self, index: usize) -> Result<Arc<RenditionMuxer>> {
        self.writer.read().rendition(index)
    }

    pub async fn index_manifest(
        &self,
        index: usize,
        segment: Option<u64>,
        part: Option<u32>,
    ) -> Result<String> {
        let muxer = self.rendition(index)?;
        muxer
            .get_index_manifest(segment, part, &self.deadline())
            .await
    }

    pub fn init_segment(&self, index: usize) -> Result<Bytes> {
        Ok(self.rendition(index)?.init_segment())
    }

    pub async fn segment(&self, index: usize, segment: u64) -> Result<Bytes> {
        let muxer = self.rendition(index)?;
        muxer.get_segment(segment, &self.deadline()).await
    }

    pub async fn fragment(&self, index: usize, segment: u64, fragment: u32) -> Result<Bytes> {
        let muxer = self.rendition(index)?;
        muxer
            .get_fragment(segment, fragment, &self.deadline())
            .await
    }

    pub fn stop(&self) {
        self.stop.cancel();
    }
}
