//! LL-HLS playlist text.
//!
//! The index playlist is assembled from pre-rendered per-segment entries; the
//! helpers here produce each piece.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::types::{MasterPlaylist, Variant};

/// File name shared by every fragment and segment URI.
pub(crate) const MEDIA_FILE: &str = "cubic.m4s";
/// File name of each rendition's index playlist.
pub const INDEX_FILE: &str = "cubic.m3u8";

/// `#EXT-X-STREAM-INF` line for one variant, without a trailing newline.
pub fn stream_inf(variant: &Variant) -> String {
    let mut out = format!("#EXT-X-STREAM-INF:BANDWIDTH={}", variant.bandwidth);
    if let Some((w, h)) = variant.resolution {
        out.push_str(&format!(",RESOLUTION={}x{}", w, h));
    }
    if !variant.codecs.is_empty() {
        out.push_str(&format!(",CODECS=\"{}\"", variant.codecs));
    }
    out
}

/// Generate the master playlist.
pub fn generate_master_playlist(playlist: &MasterPlaylist) -> String {
    let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:7\n");
    for variant in &playlist.variants {
        out.push_str(&format!("{}\n{}\n", stream_inf(variant), variant.uri));
    }
    out
}

/// Header of a rendition's index playlist.
pub(crate) fn index_header(
    segment_duration: Duration,
    part_target: Duration,
    media_sequence: u64,
) -> String {
    // TARGETDURATION must not be below any segment duration, so round up.
    let target_duration = segment_duration.as_secs_f64().ceil() as u64;
    format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:7\n\
         #EXT-X-TARGETDURATION:{}\n\
         #EXT-X-SERVER-CONTROL:CAN-BLOCK-RELOAD=YES,PART-HOLD-BACK={:.5}\n\
         #EXT-X-MAP:URI=\"init.mp4\"\n\
         #EXT-X-PART-INF:PART-TARGET={:.5}\n\
         #EXT-X-MEDIA-SEQUENCE:{}\n",
        target_duration,
        segment_duration.as_secs_f64(),
        part_target.as_secs_f64(),
        media_sequence
    )
}

pub(crate) fn preload_hint(segment_id: u64, fragment_id: u32) -> String {
    format!(
        "#EXT-X-PRELOAD-HINT:TYPE=PART,URI=\"fragment/{}/{}/{}\"\n",
        segment_id, fragment_id, MEDIA_FILE
    )
}

pub(crate) fn part(segment_id: u64, fragment_id: u32, duration: Duration, independent: bool) -> String {
    let independent = if independent { ",INDEPENDENT=YES" } else { "" };
    format!(
        "#EXT-X-PART:DURATION={:.5}{},URI=\"fragment/{}/{}/{}\"\n",
        duration.as_secs_f64(),
        independent,
        segment_id,
        fragment_id,
        MEDIA_FILE
    )
}

/// Lines closing a segment: program date time, duration and segment URI.
pub(crate) fn segment_tail(segment_id: u64, created_at: DateTime<Utc>, duration: Duration) -> String {
    format!(
        "#EXT-X-PROGRAM-DATE-TIME:{}\n#EXTINF:{:.5}\nsegment/{}/{}\n",
        created_at.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
        duration.as_secs_f64(),
        segment_id,
        MEDIA_FILE
    )
}
