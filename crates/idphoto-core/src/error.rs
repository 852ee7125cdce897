//! Error types for the idphoto pipeline.
//!
//! Only [`PipelineError`] crosses the pipeline boundary. Cache failures are
//! [`CacheError`] values that the pipeline logs and absorbs; orientation
//! problems never become errors at all (see
//! [`OrientationOutcome`](crate::pipeline::OrientationOutcome)).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for idphoto operations.
#[derive(Error, Debug)]
pub enum IdPhotoError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A worker task panicked or the pool was shut down
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Which side of the boundary a pipeline failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request: unreadable bytes, bad dimensions, unknown size. Never retried.
    Input,
    /// Internal failure during crop/resize/encode. Fatal to the request only.
    Transform,
}

/// Failures that abort a single pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Size identifier is not in the catalog
    #[error("Unknown size identifier: {0}")]
    UnknownSize(String),

    /// Requested target dimensions are not positive
    #[error("Invalid target dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Brightness or contrast factor is not a positive finite number
    #[error("Invalid {name} factor: {value}")]
    InvalidTone { name: &'static str, value: f32 },

    /// No bytes were submitted
    #[error("Empty input")]
    EmptyInput,

    /// Input exceeds the configured byte limit
    #[error("Input too large: {size_mb}MB > {max_mb}MB")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    /// Input is not a supported raster format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Image bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Decoded image exceeds the configured dimension limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge { width: u32, height: u32, max_dim: u32 },

    /// Decoded image has a zero dimension
    #[error("Image has no pixels: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// Crop/resize produced something other than the requested geometry
    #[error("Transform failed: {0}")]
    Transform(String),

    /// JPEG encoding failed
    #[error("Encode failed: {0}")]
    Encode(String),
}

impl PipelineError {
    /// Classify the failure for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Transform(_) | PipelineError::Encode(_) => ErrorKind::Transform,
            _ => ErrorKind::Input,
        }
    }

    /// True for failures caused by the request itself.
    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }
}

/// Soft failures against the cache directory. Never surfaced to callers of
/// the pipeline.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem failure
    #[error("Cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Entry exists but does not decode as an image
    #[error("Corrupt cache entry {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Entry decodes but has the wrong geometry for its key
    #[error("Cache entry {path} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    DimensionMismatch {
        path: PathBuf,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Temp file could not be renamed over the entry
    #[error("Failed to persist cache entry {path}: {message}")]
    Persist { path: PathBuf, message: String },
}

/// Convenience type alias for idphoto results.
pub type Result<T> = std::result::Result<T, IdPhotoError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
