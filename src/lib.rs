//! llhls - live low-latency HLS packager
//!
//! Turns timestamped H.264/H.265/AAC packets into fragmented MP4 parts and
//! segments, and keeps LL-HLS playlists for every source current.
//!
//! The box writers and per-rendition state machines live in `llhls-media`;
//! this crate adds the multi-rendition writer task, configuration and the
//! command line tool.

pub mod config;
pub mod export;
pub mod lifecycle;
pub mod synth;
pub mod writer;

pub use writer::{HlsStreamer, MultiRenditionWriter, WriterCommand};
