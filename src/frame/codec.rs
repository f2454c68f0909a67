//! Frame parsing and decompression.
//!
//! Reads one frame at a time from a byte source positioned at a frame
//! boundary: header first, then the compressed payload staged in the
//! source's buffer, checksum-verified before any decompression happens.

use crate::cache::DecompressedBlock;
use crate::config::CompressionType;
use crate::error::{Error, Result};
use crate::frame::{CHECKSUM_SIZE, FRAME_HEADER_SIZE, MAX_FRAME_SIZE, METHOD_HEADER_SIZE};
use crate::source::FileSource;
use bytes::Bytes;

/// One parsed compressed frame, with its payload staged in the byte
/// source's buffer.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Compression method of the payload.
    pub method: CompressionType,
    /// Frame bytes without the checksum field (header + payload).
    pub compressed_size: usize,
    /// Total bytes the frame occupies in the file, checksum included.
    pub compressed_size_total: u64,
    /// Declared size of the decompressed payload.
    pub decompressed_size: usize,
    /// The compressed payload.
    pub payload: &'a [u8],
}

/// Read one frame from a source positioned at a frame boundary.
///
/// Returns `Ok(None)` on a clean end of stream (no header bytes left).
/// Fails with `Error::Frame` on truncated or implausible framing and
/// `Error::ChecksumMismatch` if the frame contents do not match the
/// stored checksum.
pub fn read_frame(source: &mut FileSource) -> Result<Option<Frame<'_>>> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let n = source.read_fully(&mut header)?;
    if n == 0 {
        // Clean end of stream
        return Ok(None);
    }
    if n < FRAME_HEADER_SIZE {
        return Err(Error::frame(format!(
            "truncated frame header: {} of {} bytes",
            n, FRAME_HEADER_SIZE
        )));
    }

    let stored_checksum = u32::from_le_bytes(header[0..4].try_into().unwrap());
    let method_byte = header[4];
    let compressed_size = u32::from_le_bytes(header[5..9].try_into().unwrap()) as usize;
    let decompressed_size = u32::from_le_bytes(header[9..13].try_into().unwrap()) as usize;

    let method = CompressionType::from_u8(method_byte)
        .ok_or_else(|| Error::frame(format!("unknown compression method {}", method_byte)))?;

    if compressed_size < METHOD_HEADER_SIZE {
        return Err(Error::frame(format!(
            "declared compressed size {} smaller than the frame header",
            compressed_size
        )));
    }
    if compressed_size > MAX_FRAME_SIZE || decompressed_size > MAX_FRAME_SIZE {
        return Err(Error::frame(format!(
            "implausible frame sizes: compressed {}, decompressed {}",
            compressed_size, decompressed_size
        )));
    }

    let payload_len = compressed_size - METHOD_HEADER_SIZE;
    let n = source.read_into_scratch(payload_len)?;
    if n < payload_len {
        return Err(Error::frame(format!(
            "truncated frame payload: {} of {} bytes",
            n, payload_len
        )));
    }
    let payload = source.scratch(payload_len);

    // Checksum covers everything after the checksum field
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&header[CHECKSUM_SIZE..]);
    hasher.update(payload);
    let actual = hasher.finalize();
    if actual != stored_checksum {
        return Err(Error::ChecksumMismatch { expected: stored_checksum, actual });
    }

    Ok(Some(Frame {
        method,
        compressed_size,
        compressed_size_total: (CHECKSUM_SIZE + compressed_size) as u64,
        decompressed_size,
        payload,
    }))
}

/// Decompress a frame payload into a caller-supplied buffer.
///
/// `dst` must be sized to the frame's declared decompressed size; the
/// buffer is filled completely or the call fails with
/// `Error::Decompression`. No partial data escapes on failure.
pub fn decompress(dst: &mut [u8], method: CompressionType, payload: &[u8]) -> Result<()> {
    match method {
        CompressionType::None => {
            if payload.len() != dst.len() {
                return Err(Error::decompression(format!(
                    "stored payload is {} bytes, declared {}",
                    payload.len(),
                    dst.len()
                )));
            }
            dst.copy_from_slice(payload);
        }
        #[cfg(feature = "snappy")]
        CompressionType::Snappy => {
            let n = snap::raw::Decoder::new()
                .decompress(payload, dst)
                .map_err(|e| Error::decompression(e.to_string()))?;
            if n != dst.len() {
                return Err(Error::decompression(format!(
                    "decompressed to {} bytes, declared {}",
                    n,
                    dst.len()
                )));
            }
        }
    }
    Ok(())
}

/// Read and decompress the frame at the source's current position.
///
/// Returns the end-of-stream sentinel (empty payload, zero compressed
/// size) on a clean end of stream.
pub fn read_block(source: &mut FileSource) -> Result<DecompressedBlock> {
    match read_frame(source)? {
        None => Ok(DecompressedBlock::end_of_stream()),
        Some(frame) => {
            let mut data = vec![0u8; frame.decompressed_size];
            decompress(&mut data, frame.method, frame.payload)?;
            Ok(DecompressedBlock::new(Bytes::from(data), frame.compressed_size_total))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameWriter;
    use std::io::{Seek, SeekFrom, Write};
    use tempfile::NamedTempFile;

    fn open_source(path: &std::path::Path) -> FileSource {
        FileSource::open(path, 0, 0, 4096, None).unwrap()
    }

    fn write_frames(data: &[&[u8]], compression: CompressionType) -> NamedTempFile {
        let temp_file = NamedTempFile::new().unwrap();
        let mut writer = FrameWriter::create(temp_file.path(), compression).unwrap();
        for block in data {
            writer.append(block).unwrap();
        }
        writer.finish().unwrap();
        temp_file
    }

    #[test]
    fn test_read_single_frame() {
        let payload = b"hello compressed world".repeat(20);
        let temp_file = write_frames(&[&payload], CompressionType::default());

        let mut source = open_source(temp_file.path());
        let block = read_block(&mut source).unwrap();
        assert_eq!(&block.data[..], &payload[..]);
        assert!(block.compressed_size > 0);

        // Next read hits the end of the stream
        let block = read_block(&mut source).unwrap();
        assert!(block.is_empty());
        assert_eq!(block.compressed_size, 0);
    }

    #[test]
    fn test_read_uncompressed_frame() {
        let payload = vec![0x5A; 500];
        let temp_file = write_frames(&[&payload], CompressionType::None);

        let mut source = open_source(temp_file.path());
        let block = read_block(&mut source).unwrap();
        assert_eq!(&block.data[..], &payload[..]);
        // None method stores the payload verbatim
        assert_eq!(block.compressed_size, (FRAME_HEADER_SIZE + payload.len()) as u64);
    }

    #[test]
    fn test_frame_sizes_match_file_layout() {
        let blocks: Vec<Vec<u8>> = (0u8..3).map(|i| vec![i; 300]).collect();
        let refs: Vec<&[u8]> = blocks.iter().map(|b| b.as_slice()).collect();
        let temp_file = write_frames(&refs, CompressionType::default());

        let mut source = open_source(temp_file.path());
        let mut offset = 0u64;
        for expected in &blocks {
            source.seek(offset).unwrap();
            let block = read_block(&mut source).unwrap();
            assert_eq!(&block.data[..], &expected[..]);
            offset += block.compressed_size;
        }
        assert_eq!(offset, temp_file.path().metadata().unwrap().len());
    }

    #[test]
    fn test_empty_file_is_end_of_stream() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut source = open_source(temp_file.path());
        assert!(read_frame(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_corrupted_payload_fails_checksum() {
        let payload = vec![0x11; 400];
        let temp_file = write_frames(&[&payload], CompressionType::default());

        // Flip a payload byte past the header
        let mut file =
            std::fs::OpenOptions::new().write(true).open(temp_file.path()).unwrap();
        file.seek(SeekFrom::Start(FRAME_HEADER_SIZE as u64 + 2)).unwrap();
        file.write_all(&[0xFF]).unwrap();
        drop(file);

        let mut source = open_source(temp_file.path());
        let result = read_block(&mut source);
        assert!(matches!(result, Err(Error::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_truncated_frame() {
        let payload = vec![0x22; 400];
        let temp_file = write_frames(&[&payload], CompressionType::default());

        let len = temp_file.path().metadata().unwrap().len();
        let file = std::fs::OpenOptions::new().write(true).open(temp_file.path()).unwrap();
        file.set_len(len - 10).unwrap();
        drop(file);

        let mut source = open_source(temp_file.path());
        let result = read_block(&mut source);
        assert!(matches!(result, Err(Error::Frame(_))));
    }

    #[test]
    fn test_truncated_header() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), [0u8; 5]).unwrap();

        let mut source = open_source(temp_file.path());
        let result = read_frame(&mut source);
        assert!(matches!(result, Err(Error::Frame(_))));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let payload = vec![0x33; 100];
        let temp_file = write_frames(&[&payload], CompressionType::default());

        // Overwrite the method byte and fix nothing else; the method check
        // runs before the checksum is verified
        let mut file =
            std::fs::OpenOptions::new().write(true).open(temp_file.path()).unwrap();
        file.seek(SeekFrom::Start(CHECKSUM_SIZE as u64)).unwrap();
        file.write_all(&[0xEE]).unwrap();
        drop(file);

        let mut source = open_source(temp_file.path());
        let result = read_frame(&mut source);
        assert!(matches!(result, Err(Error::Frame(_))));
    }

    #[test]
    fn test_decompress_none_length_mismatch() {
        let payload = [1u8, 2, 3];
        let mut dst = vec![0u8; 5];
        let result = decompress(&mut dst, CompressionType::None, &payload);
        assert!(matches!(result, Err(Error::Decompression(_))));
    }
}
