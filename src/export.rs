//! Dump a writer's current state to a directory laid out like the URIs in
//! its playlists.

use std::path::Path;
use std::time::Duration;

use llhls_common::{Error, Result};
use llhls_media::hls::INDEX_FILE;
use llhls_media::{Deadline, RenditionMuxer};
use tracing::debug;

use crate::writer::HlsStreamer;

pub const MASTER_FILE: &str = "master.m3u8";
const INIT_FILE: &str = "init.mp4";
const MEDIA_FILE: &str = "cubic.m4s";

/// What [`export`] wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub renditions: usize,
    pub segments: usize,
    pub parts: usize,
}

/// Write the master playlist and, per rendition, its index playlist, init
/// segment, closed segments and closed parts. Nothing open is waited for.
pub async fn export(hls: &HlsStreamer, dir: &Path) -> Result<ExportSummary> {
    let mut summary = ExportSummary::default();
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(MASTER_FILE), hls.master_playlist()).await?;

    for index in 0..hls.rendition_count() {
        let muxer = hls.rendition(index)?;
        let root = dir.join(hls.writer_id().to_string()).join(index.to_string());
        tokio::fs::create_dir_all(&root).await?;
        tokio::fs::write(root.join(INDEX_FILE), muxer.index_manifest()).await?;
        tokio::fs::write(root.join(INIT_FILE), muxer.init_segment()).await?;

        let (segments, parts) = export_media(&muxer, &root).await?;
        debug!(rendition = index, segments, parts, "rendition exported");
        summary.renditions += 1;
        summary.segments += segments;
        summary.parts += parts;
    }
    Ok(summary)
}

async fn export_media(muxer: &RenditionMuxer, root: &Path) -> Result<(usize, usize)> {
    let (mut segments, mut parts) = (0, 0);
    // expires on first wait: only already closed media is returned
    let now = Deadline::after(Duration::ZERO);

    for id in muxer.live_segment_ids() {
        match muxer.get_segment(id, &now).await {
            Ok(bytes) => {
                let path = root.join("segment").join(id.to_string());
                tokio::fs::create_dir_all(&path).await?;
                tokio::fs::write(path.join(MEDIA_FILE), bytes).await?;
                segments += 1;
            }
            Err(Error::Timeout(_)) => {}
            Err(e) => return Err(e),
        }

        for fragment in 0u32.. {
            let bytes = match muxer.get_fragment(id, fragment, &now).await {
                Ok(bytes) => bytes,
                Err(Error::Timeout(_) | Error::NotFound { .. }) => break,
                Err(e) => return Err(e),
            };
            let path = root
                .join("fragment")
                .join(id.to_string())
                .join(fragment.to_string());
            tokio::fs::create_dir_all(&path).await?;
            tokio::fs::write(path.join(MEDIA_FILE), bytes).await?;
            parts += 1;
        }
    }
    Ok((segments, parts))
}
