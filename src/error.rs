//! Error types for the block cache read path.

use std::fmt;
use std::io;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for cached-block read operations.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred.
    Io(io::Error),

    /// A compressed frame is corrupt or truncated.
    Frame(String),

    /// Decompression of a frame payload failed.
    Decompression(String),

    /// A checksum mismatch was detected on a compressed frame.
    ChecksumMismatch {
        /// The checksum stored in the frame header.
        expected: u32,
        /// The checksum computed over the frame contents.
        actual: u32,
    },

    /// A seek targeted a position past the end of a decompressed block.
    OutOfBounds {
        /// The requested offset within the decompressed block.
        requested: usize,
        /// The length of the decompressed block.
        available: usize,
    },

    /// An invalid argument was provided.
    InvalidArgument(String),
}

impl Error {
    /// Creates a new frame corruption error.
    pub fn frame(msg: impl Into<String>) -> Self {
        Error::Frame(msg.into())
    }

    /// Creates a new decompression error.
    pub fn decompression(msg: impl Into<String>) -> Self {
        Error::Decompression(msg.into())
    }

    /// Creates a new invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Frame(msg) => write!(f, "Frame corruption: {}", msg),
            Error::Decompression(msg) => write!(f, "Decompression failed: {}", msg),
            Error::ChecksumMismatch { expected, actual } => {
                write!(f, "Checksum mismatch: expected {:#x}, got {:#x}", expected, actual)
            }
            Error::OutOfBounds { requested, available } => {
                write!(
                    f,
                    "Seek position {} is beyond the decompressed block of {} bytes",
                    requested, available
                )
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
