//! LRU (Least Recently Used) cache implementation for decompressed blocks.
//!
//! This module provides a thread-safe, byte-budgeted LRU cache keyed by
//! `(stream path, compressed offset)` and holding reference-counted
//! decompressed frame payloads.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A unique identifier for a cached decompressed block.
///
/// A 128-bit value derived from the stream path and the compressed-file
/// offset of the frame. The derivation is deterministic, so any two readers
/// of the same path and offset resolve to the same key. Collision
/// resistance is birthday-bound, not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u128);

/// A decompressed frame payload together with its on-disk footprint.
///
/// Immutable once constructed. The cache table and any number of readers
/// share one block through `Arc`; evicting the cache's slot never
/// invalidates a reference a reader still holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressedBlock {
    /// The decompressed payload. Empty for the end-of-stream sentinel.
    pub data: Bytes,
    /// Total bytes the frame occupied in the compressed file
    /// (checksum + header + payload). Zero for the sentinel.
    pub compressed_size: u64,
}

impl DecompressedBlock {
    /// Create a block from a decompressed payload and its compressed footprint.
    pub fn new(data: Bytes, compressed_size: u64) -> Self {
        Self { data, compressed_size }
    }

    /// Create the zero-length end-of-stream sentinel.
    pub fn end_of_stream() -> Self {
        Self { data: Bytes::new(), compressed_size: 0 }
    }

    /// Length of the decompressed payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether this is the end-of-stream sentinel (empty payload).
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Statistics for cache performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total number of cache lookups
    pub lookups: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of insertions
    pub insertions: u64,
    /// Number of evictions
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }

    /// Reset all statistics to zero
    pub fn reset(&mut self) {
        self.lookups = 0;
        self.hits = 0;
        self.misses = 0;
        self.insertions = 0;
        self.evictions = 0;
    }
}

/// Thread-safe LRU cache for decompressed blocks.
///
/// Capacity and weight are accounted in decompressed payload bytes, not
/// entry counts, so a cache of mixed block sizes converges on byte-budget
/// semantics. Uses a HashMap for O(1) lookups and a VecDeque for
/// maintaining LRU order.
///
/// # Thread Safety
///
/// This cache is thread-safe and is intended to be shared across reader
/// sessions on multiple threads using `Arc<BlockCache>`.
#[derive(Debug)]
pub struct BlockCache {
    /// Maximum total payload weight in bytes
    capacity: usize,
    /// Current total payload weight in bytes
    current_weight: AtomicU64,
    /// Cache entries stored by key
    cache: RwLock<HashMap<CacheKey, Arc<DecompressedBlock>>>,
    /// LRU queue (most recently used at the back)
    lru_queue: RwLock<VecDeque<CacheKey>>,
    /// Cache statistics
    stats: RwLock<CacheStats>,
}

impl BlockCache {
    /// Create a new BlockCache with the specified capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum total decompressed payload bytes.
    ///   Set to 0 to disable caching.
    ///
    /// # Examples
    ///
    /// ```
    /// use blockcache::BlockCache;
    ///
    /// // Create a 64MB cache
    /// let cache = BlockCache::new(64 * 1024 * 1024);
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            current_weight: AtomicU64::new(0),
            cache: RwLock::new(HashMap::new()),
            lru_queue: RwLock::new(VecDeque::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Compute the cache key for a frame of the given stream.
    ///
    /// Pure and deterministic: repeated calls with the same path and offset
    /// produce the same key, on any thread.
    pub fn hash(path: &Path, compressed_offset: u64) -> CacheKey {
        // Two independently tagged 64-bit passes form the 128-bit key.
        let mut high = DefaultHasher::new();
        0u8.hash(&mut high);
        path.hash(&mut high);
        compressed_offset.hash(&mut high);

        let mut low = DefaultHasher::new();
        1u8.hash(&mut low);
        path.hash(&mut low);
        compressed_offset.hash(&mut low);

        CacheKey(((high.finish() as u128) << 64) | low.finish() as u128)
    }

    /// Get a block from the cache.
    ///
    /// Returns a counted reference to the block if resident (cache hit), or
    /// `None` if not found (cache miss). A lookup never triggers I/O.
    ///
    /// This operation updates the LRU order, moving the accessed entry
    /// to the most recently used position.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<DecompressedBlock>> {
        // Update lookup count
        {
            let mut stats = self.stats.write();
            stats.lookups += 1;
        }

        // Check if disabled
        if self.capacity == 0 {
            return None;
        }

        // Try to get from cache
        let cache = self.cache.read();
        if let Some(block) = cache.get(key) {
            // Cache hit - update LRU order
            let result = Arc::clone(block);
            drop(cache); // Release read lock before acquiring write lock

            // Move to end of LRU queue (most recently used)
            self.touch(key);

            // Update hit count
            {
                let mut stats = self.stats.write();
                stats.hits += 1;
            }

            Some(result)
        } else {
            // Cache miss
            drop(cache);
            {
                let mut stats = self.stats.write();
                stats.misses += 1;
            }
            None
        }
    }

    /// Insert a block into the cache.
    ///
    /// If the new total weight would exceed the capacity, evicts the least
    /// recently used entries first, so the bound holds after every insert
    /// and the inserted block is never its own victim. Evicting a slot only
    /// drops the table's reference; readers holding the block keep it.
    ///
    /// A block heavier than the whole capacity is not inserted at all.
    pub fn set(&self, key: CacheKey, block: Arc<DecompressedBlock>) {
        // Check if disabled
        if self.capacity == 0 {
            return;
        }

        let weight = block.len();

        // A single block heavier than the budget can never fit
        if weight > self.capacity {
            log::debug!(
                "skipping cache insert of {} byte block (capacity {} bytes)",
                weight,
                self.capacity
            );
            return;
        }

        // Eviction and insert happen under one critical section, so the
        // weight bound holds after every set even under concurrent callers
        let mut cache = self.cache.write();
        let mut lru_queue = self.lru_queue.write();
        let mut evictions = 0u64;

        // Replace an existing mapping for this key first
        if let Some(old_block) = cache.remove(&key) {
            self.current_weight.fetch_sub(old_block.len() as u64, Ordering::Relaxed);
            lru_queue.retain(|k| k != &key);
        }

        // Evict least recently used entries until the new block fits.
        // The block being inserted is not in the queue yet, so it can
        // never be its own victim.
        while self.current_weight.load(Ordering::Relaxed) as usize + weight > self.capacity {
            let victim = match lru_queue.pop_front() {
                Some(victim) => victim,
                None => break,
            };
            if let Some(evicted) = cache.remove(&victim) {
                self.current_weight.fetch_sub(evicted.len() as u64, Ordering::Relaxed);
                evictions += 1;
            }
        }

        // Insert new entry
        cache.insert(key, block);
        lru_queue.push_back(key);
        self.current_weight.fetch_add(weight as u64, Ordering::Relaxed);

        // Update stats
        drop(cache);
        drop(lru_queue);
        if evictions > 0 {
            log::trace!("evicted {} blocks to fit a {} byte insert", evictions, weight);
        }
        {
            let mut stats = self.stats.write();
            stats.insertions += 1;
            stats.evictions += evictions;
        }
    }

    /// Touch a key to mark it as recently used.
    ///
    /// Moves the key to the end of the LRU queue without changing its value.
    ///
    /// # Performance Note
    ///
    /// This operation is O(n) due to linear search in VecDeque. For typical
    /// budgets (tens of MB, block-sized entries) this is acceptable. For very
    /// large caches (>10K entries), consider a more efficient structure.
    fn touch(&self, key: &CacheKey) {
        let mut lru_queue = self.lru_queue.write();

        // Find and remove the key from its current position
        if let Some(pos) = lru_queue.iter().position(|k| k == key) {
            lru_queue.remove(pos);
        }

        // Add to the end (most recently used)
        lru_queue.push_back(*key);
    }

    /// Get current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }

    /// Reset cache statistics to zero.
    pub fn reset_stats(&self) {
        let mut stats = self.stats.write();
        stats.reset();
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        let mut cache = self.cache.write();
        let mut lru_queue = self.lru_queue.write();

        cache.clear();
        lru_queue.clear();
        self.current_weight.store(0, Ordering::Relaxed);
    }

    /// Get the current total payload weight in bytes.
    pub fn weight(&self) -> usize {
        self.current_weight.load(Ordering::Relaxed) as usize
    }

    /// Get the cache capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of entries in the cache.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
