//! Cached compressed-block reader.
//!
//! A per-session reader over a compressed file that resolves every frame
//! through a shared [`BlockCache`] before touching disk. On a miss it
//! lazily opens the byte source, reads and decompresses the frame, and
//! publishes the result back into the cache for other readers.
//!
//! The trade-off is the same as for any shared decompressed-block cache:
//! when long runs of mostly-uncached data are read, the reader pays one
//! seek per frame instead of streaming.

use crate::cache::{BlockCache, DecompressedBlock};
use crate::config::ReaderOptions;
use crate::error::{Error, Result};
use crate::frame;
use crate::source::FileSource;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// A reader session over one compressed stream, backed by a shared cache.
///
/// Each session owns its cursor, staging buffer, and currently-held block;
/// sessions are not shared across threads. Only the cache is shared.
///
/// Usage:
/// ```no_run
/// use blockcache::{BlockCache, CachedBlockReader, ReaderOptions};
/// use std::sync::Arc;
///
/// let cache = Arc::new(BlockCache::new(64 * 1024 * 1024));
/// let mut reader =
///     CachedBlockReader::new("column.bin", Arc::clone(&cache), ReaderOptions::default());
///
/// let mut buf = vec![0u8; 4096];
/// let n = reader.read(&mut buf).unwrap();
/// println!("read {} bytes", n);
/// ```
pub struct CachedBlockReader {
    /// Path of the compressed stream
    path: PathBuf,

    /// Shared decompressed-block cache
    cache: Arc<BlockCache>,

    /// Byte-source sizing inputs
    options: ReaderOptions,

    /// Reusable staging buffer, handed to the byte source on first open
    scratch: Option<Vec<u8>>,

    /// Lazily-opened byte source (only materialized on a cache miss)
    source: Option<FileSource>,

    /// Compressed-file offset of the next frame to fetch
    file_pos: u64,

    /// The block currently exposed as the readable window.
    /// Held independently of the cache's own slot, so eviction cannot
    /// invalidate it.
    owned: Option<Arc<DecompressedBlock>>,

    /// Read cursor within the current block's payload
    pos: usize,

    /// Logical bytes consumed before the current window position.
    /// Wrapping, so that `count = consumed + pos` survives backwards seeks.
    consumed: u64,
}

impl CachedBlockReader {
    /// Create a reader session for the stream at `path`.
    ///
    /// No I/O happens until the first cache miss.
    pub fn new<P: Into<PathBuf>>(path: P, cache: Arc<BlockCache>, options: ReaderOptions) -> Self {
        Self {
            path: path.into(),
            cache,
            options,
            scratch: None,
            source: None,
            file_pos: 0,
            owned: None,
            pos: 0,
            consumed: 0,
        }
    }

    /// Create a reader session with a reusable staging buffer recycled
    /// from a previous session (see [`into_buffer`](Self::into_buffer)).
    pub fn with_buffer<P: Into<PathBuf>>(
        path: P,
        cache: Arc<BlockCache>,
        options: ReaderOptions,
        buffer: Vec<u8>,
    ) -> Self {
        let mut reader = Self::new(path, cache, options);
        reader.scratch = Some(buffer);
        reader
    }

    /// Advance to the frame at the current compressed-file cursor.
    ///
    /// Resolves the frame through the cache first; on a miss, lazily opens
    /// the byte source, reads and decompresses the frame, and publishes it
    /// for other readers. Returns `false` when the stream is exhausted.
    /// The end-of-stream sentinel is never inserted into the cache.
    pub fn read_next(&mut self) -> Result<bool> {
        // Retire the current window; the prior block reference is released
        // before a new one is taken.
        self.consumed = self.consumed.wrapping_add(self.pos as u64);
        self.pos = 0;
        self.owned = None;

        let key = BlockCache::hash(&self.path, self.file_pos);
        let block = match self.cache.get(&key) {
            Some(block) => block,
            None => {
                log::trace!("cache miss for {:?} at offset {}", self.path, self.file_pos);
                self.ensure_open()?;
                let source = self.source.as_mut().expect("byte source opened above");
                source.seek(self.file_pos)?;

                let block = Arc::new(frame::read_block(source)?);
                if block.compressed_size != 0 {
                    self.cache.set(key, Arc::clone(&block));
                }
                block
            }
        };

        if block.is_empty() {
            return Ok(false);
        }

        self.file_pos += block.compressed_size;
        self.owned = Some(block);
        Ok(true)
    }

    /// Seek to a two-level position: a frame's compressed-file offset and
    /// an offset within that frame's decompressed payload.
    ///
    /// If the target frame is the one currently held, the cursor moves
    /// within the in-memory block with no I/O or cache lookup. Otherwise
    /// the frame at `compressed_offset` is fetched, and a
    /// `decompressed_offset` past its payload fails with
    /// [`Error::OutOfBounds`].
    pub fn seek(&mut self, compressed_offset: u64, decompressed_offset: usize) -> Result<()> {
        let within_current = self.owned.as_ref().is_some_and(|block| {
            compressed_offset == self.file_pos - block.compressed_size
                && decompressed_offset <= block.len()
        });

        if within_current {
            self.consumed = self
                .consumed
                .wrapping_add(self.pos as u64)
                .wrapping_sub(decompressed_offset as u64);
            self.pos = decompressed_offset;
            return Ok(());
        }

        self.file_pos = compressed_offset;
        self.read_next()?;

        let available = self.window_len();
        if decompressed_offset > available {
            return Err(Error::OutOfBounds { requested: decompressed_offset, available });
        }
        self.consumed = self.consumed.wrapping_sub(decompressed_offset as u64);
        self.pos = decompressed_offset;
        Ok(())
    }

    /// Copy decompressed bytes into `out`, advancing through frames as
    /// the current window is exhausted.
    ///
    /// Returns the number of bytes copied; 0 means the stream is
    /// exhausted.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut written = 0;
        while written < out.len() {
            if self.pos == self.window_len() && !self.read_next()? {
                break;
            }
            let block = self.owned.as_ref().expect("window present after read_next");
            let n = (out.len() - written).min(block.len() - self.pos);
            out[written..written + n].copy_from_slice(&block.data[self.pos..self.pos + n]);
            self.pos += n;
            written += n;
        }
        Ok(written)
    }

    /// The unread span of the current decompressed block.
    ///
    /// Empty both when the current window is exhausted and when no window
    /// is loaded yet; [`read_next`](Self::read_next) distinguishes the two.
    pub fn remaining(&self) -> &[u8] {
        match &self.owned {
            Some(block) => &block.data[self.pos..],
            None => &[],
        }
    }

    /// Mark `n` bytes of the current window as consumed.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.window_len() - self.pos, "cannot consume past the current block");
        self.pos += n;
    }

    /// Total logical bytes consumed by this session, consistent across
    /// both seek paths.
    pub fn count(&self) -> u64 {
        self.consumed.wrapping_add(self.pos as u64)
    }

    /// The compressed-file offset of the next frame to fetch.
    ///
    /// After a successful [`read_next`](Self::read_next) this is the
    /// offset immediately past the just-read frame.
    pub fn position(&self) -> u64 {
        self.file_pos
    }

    /// Consume the session, recovering the staging buffer so the next
    /// session can reuse it.
    ///
    /// Returns `None` if the session was created without a buffer and
    /// never opened its byte source.
    pub fn into_buffer(self) -> Option<Vec<u8>> {
        match self.source {
            Some(source) => Some(source.into_buffer()),
            None => self.scratch,
        }
    }

    /// Open the byte source if this session has not done so yet.
    fn ensure_open(&mut self) -> Result<()> {
        if self.source.is_none() {
            self.options.validate()?;
            let source = FileSource::open(
                &self.path,
                self.options.estimated_size,
                self.options.aio_threshold,
                self.options.buf_size,
                self.scratch.take(),
            )?;
            self.source = Some(source);
        }
        Ok(())
    }

    fn window_len(&self) -> usize {
        self.owned.as_ref().map_or(0, |block| block.len())
    }
}

impl io::Read for CachedBlockReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        CachedBlockReader::read(self, buf).map_err(|e| match e {
            Error::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        })
    }
}

impl std::fmt::Debug for CachedBlockReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedBlockReader")
            .field("path", &self.path)
            .field("file_pos", &self.file_pos)
            .field("pos", &self.pos)
            .field("has_block", &self.owned.is_some())
            .finish()
    }
}
