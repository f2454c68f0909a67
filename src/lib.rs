//! # BlockCache - A Decompressed-Block Cache for Columnar Read Paths
//!
//! BlockCache is the decompressed-block cache layer of a columnar storage
//! engine's read path. Readers serve logical byte ranges of a compressed
//! on-disk stream by consulting a shared cache of already-decompressed
//! blocks, falling back to disk I/O plus decompression on a miss and
//! publishing the fresh block back into the cache for future readers.
//!
//! ## Architecture
//!
//! The crate consists of several key components:
//!
//! - **BlockCache**: Shared, byte-budgeted LRU cache of decompressed blocks
//! - **CachedBlockReader**: Per-session reader with two-level seeking
//! - **Frame codec**: Checksummed, length-prefixed compressed frames
//! - **FileSource**: Lazily-opened seekable byte source with adaptive
//!   staging-buffer sizing
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use blockcache::{BlockCache, CachedBlockReader, ReaderOptions};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), blockcache::Error> {
//! // One cache for the whole process, shared by all readers
//! let cache = Arc::new(BlockCache::new(64 * 1024 * 1024));
//!
//! let mut reader = CachedBlockReader::new(
//!     "part0/column.bin",
//!     Arc::clone(&cache),
//!     ReaderOptions::default(),
//! );
//!
//! // Jump to a frame and a position inside its decompressed payload
//! reader.seek(0, 128)?;
//!
//! let mut buf = vec![0u8; 4096];
//! let n = reader.read(&mut buf)?;
//! println!("read {} bytes, hit rate {:.2}", n, cache.stats().hit_rate());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod cache;
pub mod config;
pub mod error;
pub mod frame;
pub mod reader;
pub mod source;

// Re-exports
pub use cache::{BlockCache, CacheKey, CacheStats, DecompressedBlock};
pub use config::{CompressionType, ReaderOptions, DEFAULT_BUFFER_SIZE};
pub use error::{Error, Result};
pub use reader::CachedBlockReader;
pub use source::FileSource;
