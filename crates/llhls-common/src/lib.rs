//! llhls-common: types shared by the packager crates.
//!
//! - [`error`] - the error taxonomy returned by every write and read path
//! - [`codec`] - codec parameters and the RFC 6381 codec tags derived from them
//! - [`packet`] - timestamped elementary-stream packets fed to the muxers

pub mod codec;
pub mod error;
pub mod packet;

pub use codec::{AudioCodecParameters, CodecKind, CodecParametersPair, VideoCodecParameters};
pub use error::{Error, Result};
pub use packet::{AudioPacket, Packet, PacketBase, VideoPacket};
