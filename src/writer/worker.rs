use std::sync::Arc;

use async_trait::async_trait;
use llhls_common::Result;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::renditions::MultiRenditionWriter;
use super::WriterCommand;
use crate::lifecycle::{Flow, Step};

/// Applies [`WriterCommand`]s in arrival order. The only writer of every
/// rendition it owns.
pub struct WriterWorker {
    commands: mpsc::Receiver<WriterCommand>,
    writer: Arc<RwLock<MultiRenditionWriter>>,
}

impl WriterWorker {
    pub fn new(
        commands: mpsc::Receiver<WriterCommand>,
        writer: Arc<RwLock<MultiRenditionWriter>>,
    ) -> Self {
        Self { commands, writer }
    }

    fn apply(&mut self, command: WriterCommand) -> Result<()> {
        match command {
            WriterCommand::Packet(packet) => {
                // route under the writer lock, write under the rendition lock only
                let muxer = self.writer.write().route(&packet)?;
                muxer.write_packet(&packet)
            }
            WriterCommand::RemoveSource(url) => {
                self.writer.write().remove_source(&url);
                Ok(())
            }
            WriterCommand::SegmentDuration(duration) => {
                debug!(segment_ms = duration.as_millis() as u64, "segment duration updated");
                self.writer.write().set_segment_duration(duration);
                Ok(())
            }
            WriterCommand::Flush(done) => {
                if done.send(()).is_err() {
                    warn!("flush requester went away before acknowledgement");
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Step for WriterWorker {
    fn name(&self) -> &'static str {
        "hls-writer"
    }

    async fn step(&mut self, stop: &CancellationToken) -> Result<Flow> {
        let command = tokio::select! {
            _ = stop.cancelled() => return Ok(Flow::Break),
            command = self.commands.recv() => command,
        };
        match command {
            Some(command) => self.apply(command).map(|_| Flow::Continue),
            None => Ok(Flow::Break),
        }
    }

    fn shutdown(&mut self) {
        self.commands.close();
        self.writer.write().close();
    }
}
