//! Error types for the LODM library.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file is not a valid archive (bad magic, truncated index, ...).
    Format,
    /// An index argument is at or beyond its table bound.
    Range,
    /// Underlying read/write/seek failure.
    Io,
    /// Geometry or image codec failure.
    Codec,
    /// The caller asked for something the archive cannot do in its state.
    Usage,
}

/// Main error type for LODM operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Invalid magic value at start of file
    #[error("Invalid LODM file: bad magic 0x{0:08x}")]
    InvalidMagic(u32),

    /// Unsupported file format version
    #[error("Unsupported LODM version: {0}")]
    UnsupportedVersion(u32),

    /// The index tables extend past the end of the file
    #[error("Index truncated: need {needed} bytes, file has {available}")]
    IndexTruncated { needed: u64, available: u64 },

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Table index out of bounds
    #[error("{table} index {index} out of bounds (count: {count})")]
    OutOfRange {
        table: &'static str,
        index: usize,
        count: usize,
    },

    /// A block read or parse ran past the available bytes
    #[error("Unexpected end of data at position {0}")]
    UnexpectedEof(u64),

    /// Geometry codec failure
    #[error("{codec} codec: {message}")]
    Codec {
        codec: &'static str,
        message: String,
    },

    /// Image codec failure
    #[error("Image codec: {0}")]
    Image(#[from] image::ImageError),

    /// A payload needed for saving has not been loaded or provided
    #[error("Missing {table} payload for index {index}")]
    MissingPayload { table: &'static str, index: usize },

    /// Operation requires an archive opened from a file or stream
    #[error("Archive has no data source")]
    NotOpen,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file parse error
    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a geometry codec error.
    pub fn codec(codec: &'static str, msg: impl Into<String>) -> Self {
        Self::Codec {
            codec,
            message: msg.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMagic(_)
            | Self::UnsupportedVersion(_)
            | Self::IndexTruncated { .. }
            | Self::InvalidStructure(_) => ErrorKind::Format,
            Self::OutOfRange { .. } => ErrorKind::Range,
            Self::FileNotFound(_) | Self::UnexpectedEof(_) | Self::Io(_) => ErrorKind::Io,
            Self::Codec { .. } | Self::Image(_) => ErrorKind::Codec,
            Self::MissingPayload { .. } | Self::NotOpen | Self::Json(_) | Self::Other(_) => {
                ErrorKind::Usage
            }
        }
    }
}

/// Result type alias for LODM operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::InvalidMagic(0xdeadbeef);
        assert!(e.to_string().contains("magic"));
        assert!(e.to_string().contains("deadbeef"));

        let e = Error::OutOfRange { table: "node", index: 5, count: 3 };
        assert!(e.to_string().contains("5"));
        assert!(e.to_string().contains("3"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::InvalidMagic(0).kind(), ErrorKind::Format);
        assert_eq!(Error::OutOfRange { table: "patch", index: 0, count: 0 }.kind(), ErrorKind::Range);
        assert_eq!(Error::codec("grid", "bad stream").kind(), ErrorKind::Codec);
        assert_eq!(Error::NotOpen.kind(), ErrorKind::Usage);
    }
}
