//! Live LL-HLS packaging.
//!
//! Packets flow into a [`RenditionMuxer`], which groups them into fragments
//! (parts) and segments and keeps the rendition's index playlist current.
//! Readers can block on segments and parts that do not exist yet; see
//! [`RenditionMuxer::get_index_manifest`].

mod deadline;
mod fragment;
mod playlist;
mod rendition;
mod segment;
mod signal;
mod types;

pub use deadline::Deadline;
pub use playlist::{generate_master_playlist, stream_inf, INDEX_FILE};
pub use rendition::{RenditionMuxer, RenditionOptions, MAX_TIMESTAMP};
pub use signal::Signal;
pub use types::{MasterPlaylist, Variant};
