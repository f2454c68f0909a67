//! Configuration options for cached block readers.

/// Default staging buffer size for compressed frame data (1MB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Options controlling how a reader session opens its byte source.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Estimated total size of the compressed stream (in bytes).
    /// Used together with `aio_threshold` to pick the buffer sizing rule.
    /// Default: 0 (unknown)
    pub estimated_size: u64,

    /// Streams whose estimated size meets or exceeds this threshold are
    /// sized for the aligned, double-buffered I/O backend.
    /// Set to 0 to disable the aligned sizing path unconditionally.
    /// Default: 0
    pub aio_threshold: u64,

    /// Requested staging buffer size for compressed frame data (in bytes).
    /// Default: 1MB
    pub buf_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self { estimated_size: 0, aio_threshold: 0, buf_size: DEFAULT_BUFFER_SIZE }
    }
}

impl ReaderOptions {
    /// Creates a new ReaderOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the estimated total stream size.
    pub fn estimated_size(mut self, size: u64) -> Self {
        self.estimated_size = size;
        self
    }

    /// Sets the I/O-mode threshold.
    pub fn aio_threshold(mut self, threshold: u64) -> Self {
        self.aio_threshold = threshold;
        self
    }

    /// Sets the staging buffer size.
    pub fn buf_size(mut self, size: usize) -> Self {
        self.buf_size = size;
        self
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.buf_size == 0 {
            return Err(crate::Error::invalid_argument("buf_size must be > 0"));
        }
        Ok(())
    }
}

/// Compression algorithms supported for frame payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionType {
    /// No compression.
    None = 0,

    /// Snappy compression (fast, moderate compression ratio).
    #[cfg(feature = "snappy")]
    Snappy = 1,
}

impl CompressionType {
    /// Convert from u8
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(CompressionType::None),
            #[cfg(feature = "snappy")]
            1 => Some(CompressionType::Snappy),
            _ => None,
        }
    }
}

impl Default for CompressionType {
    fn default() -> Self {
        #[cfg(feature = "snappy")]
        return CompressionType::Snappy;

        #[cfg(not(feature = "snappy"))]
        CompressionType::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = ReaderOptions::default();
        assert_eq!(opts.estimated_size, 0);
        assert_eq!(opts.aio_threshold, 0);
        assert_eq!(opts.buf_size, DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn test_options_builder() {
        let opts = ReaderOptions::new()
            .estimated_size(64 * 1024 * 1024)
            .aio_threshold(16 * 1024 * 1024)
            .buf_size(4096);

        assert_eq!(opts.estimated_size, 64 * 1024 * 1024);
        assert_eq!(opts.aio_threshold, 16 * 1024 * 1024);
        assert_eq!(opts.buf_size, 4096);
    }

    #[test]
    fn test_options_validation() {
        let mut opts = ReaderOptions::default();
        assert!(opts.validate().is_ok());

        opts.buf_size = 0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_compression_type_roundtrip() {
        assert_eq!(CompressionType::from_u8(0), Some(CompressionType::None));
        #[cfg(feature = "snappy")]
        assert_eq!(CompressionType::from_u8(1), Some(CompressionType::Snappy));
        assert_eq!(CompressionType::from_u8(200), None);
    }
}
