//! Shared cache of decompressed blocks.
//!
//! Provides an LRU (Least Recently Used) cache mapping `(stream path,
//! compressed offset)` to already-decompressed frame payloads, so that
//! readers hitting the same blocks skip disk I/O and decompression.

mod lru;

pub use lru::{BlockCache, CacheKey, CacheStats, DecompressedBlock};
