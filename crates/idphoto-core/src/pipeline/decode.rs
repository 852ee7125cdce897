//! Image decoding with content-based format detection and size limits.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::metadata::{ExifProbe, MetadataExtractor};

/// Image decoder with configurable limits.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    exif: ExifProbe,
}

impl DecodedImage {
    /// EXIF metadata carried by the source container.
    pub fn exif(&self) -> &ExifProbe {
        &self.exif
    }

    /// Force interleaved 8-bit RGB, dropping alpha and widening grayscale.
    pub fn into_rgb8(self) -> (DynamicImage, ExifProbe) {
        let image = match self.image {
            rgb @ DynamicImage::ImageRgb8(_) => rgb,
            other => {
                tracing::debug!("Converted image to RGB from {:?}", other.color());
                DynamicImage::ImageRgb8(other.into_rgb8())
            }
        };
        (image, self.exif)
    }
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an image from an in-memory byte buffer.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, PipelineError> {
        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode(format!("Cannot detect image format: {}", e)))?;
        let format = reader
            .format()
            .ok_or_else(|| PipelineError::UnsupportedFormat("unknown".to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyImage { width, height });
        }
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        let exif = MetadataExtractor::probe(bytes, format);

        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            exif,
        })
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpeg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        ImageFormat::Tiff => "tiff",
        ImageFormat::Bmp => "bmp",
        _ => "unknown",
    }
}
