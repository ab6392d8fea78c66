//! llhls-media: fragmented MP4 assembly and live LL-HLS rendition muxing.
//!
//! # Modules
//!
//! - [`fmp4`] - ISO BMFF boxes: init segments, movie fragments, segment indexes
//! - [`hls`] - fragment/segment state machines, the rendition muxer and playlist rendering

pub mod fmp4;
pub mod hls;

pub use fmp4::Fmp4Muxer;
pub use hls::{
    generate_master_playlist, Deadline, MasterPlaylist, RenditionMuxer, RenditionOptions, Signal,
    Variant,
};
