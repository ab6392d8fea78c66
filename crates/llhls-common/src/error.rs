//! Common error types used throughout llhls.
//!
//! Write paths reject bad input with a typed error and leave state untouched.
//! Read paths distinguish "does not exist" from "not yet, and the caller gave
//! up" so an HTTP front end can map them to different status codes.

/// Common error type for llhls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The codec cannot be carried in a fragmented MP4 track.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// A rendition was initialized without any video or audio parameters.
    #[error("No codec data")]
    NoCodecData,

    /// A packet arrived with an empty payload.
    #[error("Empty packet from {0}")]
    EmptyPacket(String),

    /// A packet's media kind has no track in the rendition.
    #[error("No {0} track in rendition")]
    TrackMissing(&'static str),

    /// The requested item was not found (or has been evicted).
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of item, e.g. "segment" or "rendition".
        entity: &'static str,
        /// Identifier as requested.
        id: String,
    },

    /// A blocking read reached its deadline.
    #[error("Timed out waiting for {0}")]
    Timeout(String),

    /// A blocking read was cancelled by the caller.
    #[error("Cancelled")]
    Cancelled,

    /// The rendition was torn down while a read was pending.
    #[error("Rendition closed")]
    Closed,

    /// The rendition exists but cannot currently produce media.
    #[error("Rendition unavailable: {0}")]
    RenditionUnavailable(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create a new UnsupportedCodec error.
    pub fn unsupported<S: Into<String>>(codec: S) -> Self {
        Self::UnsupportedCodec(codec.into())
    }

    /// Create a new Timeout error.
    pub fn timeout<S: Into<String>>(what: S) -> Self {
        Self::Timeout(what.into())
    }

    /// Create a new Config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status a transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Timeout(_) => 504,
            Self::Cancelled => 499,
            Self::Closed | Self::RenditionUnavailable(_) => 503,
            Self::UnsupportedCodec(_) => 415,
            Self::NoCodecData | Self::EmptyPacket(_) | Self::TrackMissing(_) | Self::Config(_) => {
                400
            }
            Self::Io(_) => 500,
        }
    }

    /// Whether retrying the same read later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Closed)
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
