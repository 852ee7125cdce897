//! JPEG encoding of finished prints.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::error::PipelineError;

/// Encodes RGB images as baseline JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: u8,
}

impl PhotoEncoder {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn encode(&self, image: &DynamicImage) -> Result<Vec<u8>, PipelineError> {
        let rgb = image.to_rgb8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode_image(&rgb)
            .map_err(|e| PipelineError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new(crate::config::OutputConfig::default().jpeg_quality)
    }
}
