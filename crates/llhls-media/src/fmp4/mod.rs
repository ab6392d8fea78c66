//! Fragmented MP4 (fMP4) serialization.
//!
//! - Init segment: `ftyp` + `moov` with one `trak` per elementary stream
//! - Fragments and segments: `styp` + one `sidx` per track + `moof` + `mdat`

pub(crate) mod boxes;
mod clamp;
pub(crate) mod fragment;
mod muxer;
mod track;

pub use fragment::{SAMPLE_NON_KEYFRAME, SAMPLE_NO_DEPENDENCIES};
pub use muxer::Fmp4Muxer;
pub use track::VIDEO_TIMESCALE;
