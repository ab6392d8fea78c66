//! HLS playlist types.

use serde::{Deserialize, Serialize};

/// A stream variant in a master playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Peak bandwidth in bits per second.
    pub bandwidth: u64,
    /// Resolution as (width, height); `None` for audio-only renditions.
    pub resolution: Option<(u32, u32)>,
    /// Codec string (e.g. "avc1.64001F,mp4a.40.2").
    pub codecs: String,
    /// URI of the variant's index playlist.
    pub uri: String,
}

/// An HLS master playlist, variants in presentation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MasterPlaylist {
    pub variants: Vec<Variant>,
}
