//! idphoto core - identity-photo processing library.
//!
//! Turns an arbitrary photograph into a print of a fixed pixel size
//! (passport, visa, national ID), correcting EXIF orientation, optionally
//! adjusting brightness and contrast, and memoizing results in a
//! content-addressed filesystem cache.
//!
//! # Architecture
//!
//! ```text
//! bytes ─> cache lookup ─hit──────────────────────────────────────> JPEG
//!               └─miss─> validate ─> decode ─> orient ─> fit ─> tone ─> encode ─> store
//! ```
//!
//! [`TransformPipeline`] is synchronous. [`PhotoService`] runs it on a
//! bounded pool of blocking workers and sweeps the cache periodically.
//!
//! # Usage
//!
//! ```rust,ignore
//! use idphoto_core::{Config, PhotoService, ProcessRequest, SizeSelection};
//!
//! #[tokio::main]
//! async fn main() -> idphoto_core::Result<()> {
//!     let config = Config::load()?;
//!     let service = PhotoService::from_config(&config)?;
//!
//!     let bytes = std::fs::read("portrait.jpg")?;
//!     let request = ProcessRequest::new(bytes, SizeSelection::Named("护照".into()));
//!     let photo = service.process(request).await?;
//!     std::fs::write("passport.jpg", &photo.bytes)?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod service;
pub mod types;

// Re-exports for convenient access
pub use cache::{CacheStats, ContentCache, DiskUsage, SweepReport};
pub use catalog::SizeCatalog;
pub use config::Config;
pub use error::{
    CacheError, ConfigError, ErrorKind, IdPhotoError, PipelineError, PipelineResult, Result,
};
pub use output::{OutputFormat, OutputWriter, PhotoReport};
pub use pipeline::{OrientationOutcome, TransformPipeline};
pub use service::PhotoService;
pub use types::{
    CacheStatus, ProcessRequest, ProcessedPhoto, SizeSelection, SizeSpec, ToneParams,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
