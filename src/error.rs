//! Error types for GIFL encoding and playback.

use std::io;
use std::path::PathBuf;

use crate::schema::ConfigError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a conversion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad or empty command line input.
    #[error("{0}")]
    Usage(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: failed to decode GIF: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("compression failed: {0}")]
    Compression(String),

    /// A header field overflowed or a container is malformed.
    #[error("invalid GIFL container: {0}")]
    Format(String),

    #[error("invalid GIFL magic bytes: {0:?}")]
    InvalidMagic([u8; 4]),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by how the tool was invoked.
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::Usage(_) | Error::Config(_) | Error::ConfigParse(_))
    }
}
