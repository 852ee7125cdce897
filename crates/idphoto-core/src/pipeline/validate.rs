//! Input validation before decoding.

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Cheap checks on raw bytes before the decoder sees them.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before full decode.
    ///
    /// Checks:
    /// - Input is not empty
    /// - Input size is within limits
    /// - Input has valid image magic bytes
    pub fn validate(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        let len = bytes.len() as u64;
        if len > max_bytes {
            return Err(PipelineError::FileTooLarge {
                size_mb: len.div_ceil(1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        if bytes.len() < 4 {
            return Err(PipelineError::Decode(
                "Input too small to be a valid image".to_string(),
            ));
        }

        if !Self::is_valid_image_header(bytes) {
            return Err(PipelineError::UnsupportedFormat(
                "unrecognized image format (invalid magic bytes)".to_string(),
            ));
        }

        Ok(())
    }

    /// Check if the leading bytes match a raster format the decoder handles.
    fn is_valid_image_header(header: &[u8]) -> bool {
        if header.len() < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // PNG: 89 50 4E 47
        if header.starts_with(&[0x89, b'P', b'N', b'G']) {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            return header.len() >= 12 && &header[8..12] == b"WEBP";
        }

        // BMP: BM
        if header.starts_with(b"BM") {
            return true;
        }

        // TIFF: II (little-endian) or MM (big-endian) followed by version 42
        header.starts_with(&[b'I', b'I', 0x2A, 0x00]) || header.starts_with(&[b'M', b'M', 0x00, 0x2A])
    }
}
