//! Image processing pipeline components.
//!
//! This module contains all the stages of the identity-photo pipeline:
//! - **validate**: Cheap checks on raw bytes (size, magic bytes)
//! - **decode**: Format sniffing, decoding and RGB normalization
//! - **metadata**: EXIF probing
//! - **orientation**: EXIF orientation correction
//! - **geometry**: Aspect-preserving crop and resize
//! - **tone**: Brightness and contrast
//! - **encode**: JPEG output
//! - **hash**: Content hashes for cache keys
//! - **discovery**: Find photographs in directories
//! - **processor**: Orchestrates the full pipeline

pub mod decode;
pub mod discovery;
pub mod encode;
pub mod geometry;
pub mod hash;
pub mod metadata;
pub mod orientation;
pub mod processor;
pub mod tone;
pub mod validate;

// Re-exports for convenient access
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use encode::PhotoEncoder;
pub use geometry::{plan_crop, CropRect, GeometryTransformer};
pub use hash::Hasher;
pub use metadata::{ExifProbe, MetadataExtractor};
pub use orientation::{Orientation, OrientationCorrector, OrientationOutcome, Oriented};
pub use processor::TransformPipeline;
pub use tone::ToneAdjuster;
pub use validate::Validator;
