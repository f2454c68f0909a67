//! Seekable byte source over a compressed file.
//!
//! A `FileSource` is opened lazily by readers on their first cache miss.
//! It owns the staging buffer that compressed frame payloads are read
//! into before decompression; the buffer can be recycled across sessions
//! and is sized by the [`buffer_capacity`] policy.

use crate::error::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Alignment unit required by the aligned I/O backend (one file block).
pub const IO_ALIGNMENT: usize = 4096;

/// Over-allocation factor applied when growing a reused staging buffer.
/// Close to the golden ratio.
const BUFFER_GROWTH_FACTOR: f64 = 1.6;

/// Compute the staging buffer capacity for a byte source open.
///
/// Pure sizing policy, separated from I/O so it can be tested in
/// isolation:
///
/// - The plain request is `buf_size`. If `aio_threshold` is non-zero and
///   `estimated_size` meets it, the request becomes twice the
///   alignment-rounded block size instead, to satisfy the aligned
///   backend's double-buffering requirement. A threshold of zero disables
///   the aligned path unconditionally.
/// - A fresh buffer (capacity 0) gets exactly the requested size. A
///   reused buffer that is too small grows by `1.6x` the request rather
///   than to the exact size, to reduce reallocations across repeated
///   opens. A buffer that is already large enough is kept as is.
pub fn buffer_capacity(
    current_capacity: usize,
    buf_size: usize,
    aio_threshold: u64,
    estimated_size: u64,
) -> usize {
    let requested = if aio_threshold != 0 && estimated_size >= aio_threshold {
        2 * align_up(buf_size + IO_ALIGNMENT, IO_ALIGNMENT)
    } else {
        buf_size
    };

    if current_capacity == 0 {
        requested
    } else if current_capacity < requested {
        (requested as f64 * BUFFER_GROWTH_FACTOR) as usize
    } else {
        current_capacity
    }
}

/// Round `size` up to a multiple of `alignment`.
fn align_up(size: usize, alignment: usize) -> usize {
    (size + alignment - 1) / alignment * alignment
}

/// A seekable byte source over a compressed file, with an owned staging
/// buffer for compressed frame payloads.
#[derive(Debug)]
pub struct FileSource {
    file: File,
    scratch: Vec<u8>,
}

impl FileSource {
    /// Open a file as a byte source.
    ///
    /// `reuse` is an optional staging buffer recycled from a previous
    /// session; its capacity feeds the [`buffer_capacity`] growth rule.
    pub fn open(
        path: &Path,
        estimated_size: u64,
        aio_threshold: u64,
        buf_size: usize,
        reuse: Option<Vec<u8>>,
    ) -> Result<Self> {
        let file = File::open(path)?;

        let mut scratch = reuse.unwrap_or_default();
        let capacity = buffer_capacity(scratch.capacity(), buf_size, aio_threshold, estimated_size);
        scratch.clear();
        if capacity > scratch.capacity() {
            scratch.reserve_exact(capacity);
        }

        log::debug!(
            "opened byte source {:?}, staging buffer capacity {} bytes",
            path,
            scratch.capacity()
        );

        Ok(Self { file, scratch })
    }

    /// Seek to an absolute offset in the file.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Fill `buf` from the current position.
    ///
    /// Returns the number of bytes read; short only at end of file.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> Result<usize> {
        read_fully(&mut self.file, buf)
    }

    /// Read up to `len` bytes into the staging buffer.
    ///
    /// Returns the number of bytes read; short only at end of file. The
    /// staged bytes are available through [`scratch`](Self::scratch).
    pub(crate) fn read_into_scratch(&mut self, len: usize) -> Result<usize> {
        if self.scratch.len() < len {
            self.scratch.resize(len, 0);
        }
        read_fully(&mut self.file, &mut self.scratch[..len])
    }

    /// The first `len` staged bytes from the last
    /// [`read_into_scratch`](Self::read_into_scratch).
    pub(crate) fn scratch(&self, len: usize) -> &[u8] {
        &self.scratch[..len]
    }

    /// Consume the source, recovering the staging buffer for reuse.
    pub fn into_buffer(self) -> Vec<u8> {
        self.scratch
    }
}

fn read_fully(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break, // EOF
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_capacity_fresh_buffer_exact() {
        assert_eq!(buffer_capacity(0, 1000, 0, 0), 1000);
    }

    #[test]
    fn test_capacity_growth_factor() {
        // 1000-byte buffer asked to hold 2000 grows to 1.6 * 2000
        assert_eq!(buffer_capacity(1000, 2000, 0, 0), 3200);
    }

    #[test]
    fn test_capacity_large_enough_kept() {
        assert_eq!(buffer_capacity(8192, 2000, 0, 0), 8192);
    }

    #[test]
    fn test_capacity_aligned_double_buffer() {
        // Estimated size crosses the threshold: 2 * align_up(1000 + 4096, 4096)
        assert_eq!(buffer_capacity(0, 1000, 1 << 20, 1 << 21), 2 * 8192);
        // Exactly at the threshold also qualifies
        assert_eq!(buffer_capacity(0, 1000, 1 << 20, 1 << 20), 2 * 8192);
    }

    #[test]
    fn test_capacity_threshold_zero_disables_aligned_path() {
        assert_eq!(buffer_capacity(0, 1000, 0, u64::MAX), 1000);
    }

    #[test]
    fn test_capacity_below_threshold_uses_plain_size() {
        assert_eq!(buffer_capacity(0, 1000, 1 << 20, 1024), 1000);
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(1, 4096), 4096);
        assert_eq!(align_up(4096, 4096), 4096);
        assert_eq!(align_up(4097, 4096), 8192);
    }

    #[test]
    fn test_read_and_seek() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(&(0u8..=255).collect::<Vec<_>>()).unwrap();
        temp_file.flush().unwrap();

        let mut source = FileSource::open(temp_file.path(), 0, 0, 64, None).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(source.read_fully(&mut buf).unwrap(), 4);
        assert_eq!(buf, [0, 1, 2, 3]);

        source.seek(100).unwrap();
        assert_eq!(source.read_fully(&mut buf).unwrap(), 4);
        assert_eq!(buf, [100, 101, 102, 103]);

        // Short read at end of file
        source.seek(254).unwrap();
        assert_eq!(source.read_fully(&mut buf).unwrap(), 2);
    }

    #[test]
    fn test_buffer_recycled_across_opens() {
        let temp_file = NamedTempFile::new().unwrap();

        let source = FileSource::open(temp_file.path(), 0, 0, 1000, None).unwrap();
        let buffer = source.into_buffer();
        assert_eq!(buffer.capacity(), 1000);

        // Reopening with a larger request grows by the 1.6x rule
        let source =
            FileSource::open(temp_file.path(), 0, 0, 2000, Some(buffer)).unwrap();
        let buffer = source.into_buffer();
        assert!(buffer.capacity() >= 3200);
    }
}
