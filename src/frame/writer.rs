//! Frame writer implementation.
//!
//! Produces the compressed frame format consumed by the codec: one
//! self-contained frame per appended block, no terminator.

use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::frame::{FRAME_HEADER_SIZE, MAX_FRAME_SIZE, METHOD_HEADER_SIZE};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// FrameWriter writes a sequence of compressed frames.
///
/// Usage:
/// ```no_run
/// use blockcache::frame::FrameWriter;
/// use blockcache::CompressionType;
///
/// let mut writer = FrameWriter::create("column.bin", CompressionType::default()).unwrap();
/// let offset = writer.append(b"block contents").unwrap();
/// assert_eq!(offset, 0);
/// writer.finish().unwrap();
/// ```
pub struct FrameWriter<W: Write> {
    writer: W,
    compression: CompressionType,
    offset: u64,
}

impl FrameWriter<BufWriter<File>> {
    /// Create a frame writer over a new file at `path`.
    pub fn create<P: AsRef<Path>>(path: P, compression: CompressionType) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), compression))
    }
}

impl<W: Write> FrameWriter<W> {
    /// Create a frame writer over an arbitrary byte sink.
    pub fn new(writer: W, compression: CompressionType) -> Self {
        Self { writer, compression, offset: 0 }
    }

    /// Append one block as a compressed frame.
    ///
    /// Returns the compressed-file offset at which the frame starts, which
    /// is the offset readers seek to for this block.
    pub fn append(&mut self, data: &[u8]) -> Result<u64> {
        if data.len() > MAX_FRAME_SIZE {
            return Err(Error::invalid_argument(format!(
                "block of {} bytes exceeds the maximum frame size",
                data.len()
            )));
        }

        let payload = self.compress(data)?;

        let mut header = [0u8; METHOD_HEADER_SIZE];
        header[0] = self.compression as u8;
        header[1..5]
            .copy_from_slice(&((METHOD_HEADER_SIZE + payload.len()) as u32).to_le_bytes());
        header[5..9].copy_from_slice(&(data.len() as u32).to_le_bytes());

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(&payload);
        let checksum = hasher.finalize();

        let frame_offset = self.offset;
        self.writer.write_all(&checksum.to_le_bytes())?;
        self.writer.write_all(&header)?;
        self.writer.write_all(&payload)?;
        self.offset += (FRAME_HEADER_SIZE + payload.len()) as u64;

        Ok(frame_offset)
    }

    /// The offset at which the next appended frame will start.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Flush buffered frames and return the total bytes written.
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.offset)
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.compression {
            CompressionType::None => Ok(data.to_vec()),
            #[cfg(feature = "snappy")]
            CompressionType::Snappy => snap::raw::Encoder::new()
                .compress_vec(data)
                .map_err(|e| Error::invalid_argument(format!("Compression failed: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_append_returns_frame_offsets() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut writer =
            FrameWriter::create(temp_file.path(), CompressionType::None).unwrap();

        let first = writer.append(&[0xAA; 100]).unwrap();
        let second = writer.append(&[0xBB; 50]).unwrap();

        assert_eq!(first, 0);
        // None compression stores payloads verbatim
        assert_eq!(second, (FRAME_HEADER_SIZE + 100) as u64);

        let total = writer.finish().unwrap();
        assert_eq!(total, (2 * FRAME_HEADER_SIZE + 150) as u64);
        assert_eq!(temp_file.path().metadata().unwrap().len(), total);
    }

    #[test]
    fn test_offset_tracks_next_frame() {
        let mut writer = FrameWriter::new(Vec::new(), CompressionType::None);
        assert_eq!(writer.offset(), 0);

        writer.append(b"abc").unwrap();
        assert_eq!(writer.offset(), (FRAME_HEADER_SIZE + 3) as u64);
    }

    #[cfg(feature = "snappy")]
    #[test]
    fn test_snappy_compresses_repetitive_data() {
        let data = vec![0x77u8; 64 * 1024];
        let mut writer = FrameWriter::new(Vec::new(), CompressionType::Snappy);
        writer.append(&data).unwrap();
        assert!(writer.offset() < data.len() as u64 / 2);
    }
}
