//! Core data types for the idphoto pipeline.
//!
//! These describe what a caller asks for (size, tone) and what comes back
//! (encoded JPEG plus a little bookkeeping about how it was produced).

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::OrientationOutcome;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// MIME type of every image the pipeline produces.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// A named print size in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeSpec {
    /// Identifier used for lookup and as part of the cache key
    pub id: String,

    /// Target width in pixels
    pub width: u32,

    /// Target height in pixels
    pub height: u32,
}

impl SizeSpec {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }

    /// A one-off size that is never registered in the catalog.
    pub fn custom(width: u32, height: u32) -> Self {
        Self::new(format!("custom_{width}x{height}"), width, height)
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Reject zero dimensions.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// How a caller picks the output size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeSelection {
    /// A catalog identifier such as "一寸"
    Named(String),
    /// Explicit pixel dimensions
    Custom { width: u32, height: u32 },
}

/// Brightness and contrast multipliers. 1.0 leaves the image untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneParams {
    pub brightness: f32,
    pub contrast: f32,
}

impl Default for ToneParams {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
        }
    }
}

impl ToneParams {
    pub fn new(brightness: f32, contrast: f32) -> Self {
        Self {
            brightness,
            contrast,
        }
    }

    /// True when both factors are exactly 1.0.
    pub fn is_identity(&self) -> bool {
        self.brightness == 1.0 && self.contrast == 1.0
    }

    /// Both factors must be positive and finite.
    pub fn validate(&self) -> PipelineResult<()> {
        for (name, value) in [("brightness", self.brightness), ("contrast", self.contrast)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PipelineError::InvalidTone { name, value });
            }
        }
        Ok(())
    }
}

/// One unit of work for the worker pool.
#[derive(Debug, Clone)]
pub struct ProcessRequest {
    /// Raw bytes of the uploaded photograph
    pub source: Vec<u8>,
    pub size: SizeSelection,
    pub tone: ToneParams,
}

impl ProcessRequest {
    pub fn new(source: Vec<u8>, size: SizeSelection) -> Self {
        Self {
            source,
            size,
            tone: ToneParams::default(),
        }
    }

    pub fn with_tone(mut self, tone: ToneParams) -> Self {
        self.tone = tone;
        self
    }
}

/// Whether a result came from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    Disabled,
}

/// The finished identity photo.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedPhoto {
    /// Encoded JPEG bytes
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// Always `image/jpeg`
    pub content_type: &'static str,

    pub width: u32,
    pub height: u32,

    /// Identifier of the size that was produced
    pub size_id: String,

    pub cache: CacheStatus,

    /// What orientation correction did. Absent on cache hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<OrientationOutcome>,
}

impl ProcessedPhoto {
    /// Render the JPEG as a `data:` URI suitable for embedding in HTML/JSON.
    pub fn to_data_uri(&self) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.content_type, encoded)
    }
}

/// EXIF fields the pipeline acts on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifData {
    /// Orientation tag value, 1-8 when well formed
    pub orientation: Option<u32>,
}
