//! Compressed frame format.
//!
//! A compressed stream is a plain sequence of self-contained frames; end of
//! stream is the end of the file. Each frame carries a checksum over
//! everything after the checksum field itself.
//!
//! ## Frame Format
//!
//! ```text
//! [checksum: u32]           // CRC32 of method + sizes + payload
//! [method: u8]              // CompressionType
//! [compressed_size: u32]    // header (9 bytes) + payload, checksum excluded
//! [decompressed_size: u32]
//! [payload: bytes]          // compressed block contents
//! ```

pub mod codec;
pub mod writer;

pub use codec::{decompress, read_block, read_frame, Frame};
pub use writer::FrameWriter;

/// Size of the checksum field in bytes.
pub const CHECKSUM_SIZE: usize = 4;

/// Size of the checksummed header: method byte plus the two size fields.
pub const METHOD_HEADER_SIZE: usize = 9;

/// Total frame header size including the checksum.
pub const FRAME_HEADER_SIZE: usize = CHECKSUM_SIZE + METHOD_HEADER_SIZE;

/// Upper bound on declared frame sizes (1GB); larger values are treated
/// as corruption.
pub const MAX_FRAME_SIZE: usize = 1 << 30;
