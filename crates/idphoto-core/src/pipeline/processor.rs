//! Pipeline orchestrator: cache lookup, decode, orient, fit, tone, encode, store.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{
    CacheKey, CacheLookup, CacheSettings, Clock, ContentCache, KeyLocks, MissReason, SweepReport,
    SystemClock,
};
use crate::catalog::SizeCatalog;
use crate::config::Config;
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::types::{
    CacheStatus, ProcessRequest, ProcessedPhoto, SizeSelection, SizeSpec, ToneParams,
    JPEG_CONTENT_TYPE,
};

use super::decode::{format_to_string, ImageDecoder};
use super::encode::PhotoEncoder;
use super::geometry::GeometryTransformer;
use super::hash::Hasher;
use super::orientation::{OrientationCorrector, OrientationOutcome};
use super::tone::ToneAdjuster;
use super::validate::Validator;

/// Cache plus the options that shape how it is used.
struct CacheLayer {
    store: ContentCache,
    locks: Option<KeyLocks>,
    key_includes_tone: bool,
}

/// Turns source bytes and a size into an encoded identity photo.
///
/// Synchronous and shareable; run it behind [`PhotoService`](crate::PhotoService)
/// for bounded concurrency.
pub struct TransformPipeline {
    catalog: SizeCatalog,
    validator: Validator,
    decoder: ImageDecoder,
    orientation: OrientationCorrector,
    geometry: GeometryTransformer,
    tone: ToneAdjuster,
    encoder: PhotoEncoder,
    cache: Option<CacheLayer>,
}

impl TransformPipeline {
    /// Build a pipeline using wall-clock time for cache expiry.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a pipeline with an explicit time source.
    ///
    /// Opens the cache directory and sweeps expired entries once. A cache
    /// that cannot be opened is logged and disabled.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;
        let catalog = SizeCatalog::new(config.sizes.clone())?;

        let cache = if config.cache.enabled {
            Self::open_cache(config, clock)
        } else {
            tracing::debug!("Result cache disabled");
            None
        };

        Ok(Self {
            catalog,
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone()),
            orientation: OrientationCorrector,
            geometry: GeometryTransformer::new(config.transform.pre_shrink_max),
            tone: ToneAdjuster::new(config.tone.contrast_pivot),
            encoder: PhotoEncoder::new(config.output.jpeg_quality),
            cache,
        })
    }

    fn open_cache(config: &Config, clock: Arc<dyn Clock>) -> Option<CacheLayer> {
        let dir = config.cache_dir();
        let store = match ContentCache::open(&dir, CacheSettings::from_config(&config.cache), clock)
        {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Running without result cache: {}", e);
                return None;
            }
        };

        match store.sweep_expired() {
            Ok(report) if report.removed > 0 => {
                tracing::info!("Removed {} expired cache entries from {:?}", report.removed, dir)
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Cache sweep failed: {}", e),
        }

        Some(CacheLayer {
            store,
            locks: config.cache.single_flight.then(KeyLocks::new),
            key_includes_tone: config.cache.key_includes_tone,
        })
    }

    pub fn catalog(&self) -> &SizeCatalog {
        &self.catalog
    }

    /// The result cache, if enabled and opened.
    pub fn cache(&self) -> Option<&ContentCache> {
        self.cache.as_ref().map(|c| &c.store)
    }

    /// Sweep expired cache entries now.
    pub fn sweep_cache(&self) -> Option<SweepReport> {
        let cache = self.cache()?;
        match cache.sweep_expired() {
            Ok(report) => {
                if report.removed > 0 {
                    tracing::info!(
                        "Cache sweep removed {} of {} files",
                        report.removed,
                        report.scanned
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::warn!("Cache sweep failed: {}", e);
                None
            }
        }
    }

    /// Turn a size selection into a concrete size without touching the catalog.
    pub fn resolve(&self, selection: &SizeSelection) -> PipelineResult<SizeSpec> {
        let size = match selection {
            SizeSelection::Named(id) => self
                .catalog
                .lookup(id)
                .cloned()
                .ok_or_else(|| PipelineError::UnknownSize(id.clone()))?,
            SizeSelection::Custom { width, height } => SizeSpec::custom(*width, *height),
        };
        size.validate()?;
        Ok(size)
    }

    /// Process with a catalog identifier. Unknown identifiers fail before
    /// any hashing, cache access or decoding.
    pub fn process_named(
        &self,
        source: &[u8],
        id: &str,
        tone: &ToneParams,
    ) -> PipelineResult<ProcessedPhoto> {
        let size = self.resolve(&SizeSelection::Named(id.to_string()))?;
        self.process(source, &size, tone)
    }

    pub fn process_request(&self, request: &ProcessRequest) -> PipelineResult<ProcessedPhoto> {
        let size = self.resolve(&request.size)?;
        self.process(&request.source, &size, &request.tone)
    }

    /// Process source bytes into a print of exactly `size`.
    pub fn process(
        &self,
        source: &[u8],
        size: &SizeSpec,
        tone: &ToneParams,
    ) -> PipelineResult<ProcessedPhoto> {
        size.validate()?;
        tone.validate()?;

        let Some(layer) = &self.cache else {
            let (bytes, orientation) = self.compute(source, size, tone)?;
            return Ok(Self::photo(bytes, size, CacheStatus::Disabled, Some(orientation)));
        };

        let hash_start = Instant::now();
        let source_hash = Hasher::content_hash(source);
        tracing::trace!("  Content hash: {:?}", hash_start.elapsed());

        let key = if layer.key_includes_tone {
            CacheKey::with_tone(&source_hash, size, tone)
        } else {
            CacheKey::new(&source_hash, size)
        };

        let run = || self.process_cached(layer, &key, source, size, tone);
        match &layer.locks {
            Some(locks) => locks.with_key(key.as_str(), run),
            None => run(),
        }
    }

    fn process_cached(
        &self,
        layer: &CacheLayer,
        key: &CacheKey,
        source: &[u8],
        size: &SizeSpec,
        tone: &ToneParams,
    ) -> PipelineResult<ProcessedPhoto> {
        match layer.store.lookup(key, size.width, size.height) {
            CacheLookup::Hit(entry) => {
                tracing::info!("Cache hit for {} ({})", key, size.id);
                if !tone.is_identity() && !layer.key_includes_tone {
                    tracing::warn!(
                        "Served cached {} without applying brightness {} / contrast {}",
                        key,
                        tone.brightness,
                        tone.contrast
                    );
                }
                return Ok(Self::photo(entry.bytes, size, CacheStatus::Hit, None));
            }
            CacheLookup::Miss(MissReason::Absent) => {
                tracing::trace!("Cache miss for {}", key);
            }
            CacheLookup::Miss(MissReason::Expired) => {
                tracing::debug!("Cache entry {} expired, recomputing", key);
            }
            CacheLookup::Miss(MissReason::Unreadable(e)) => {
                tracing::warn!("Ignoring unusable cache entry: {}", e);
            }
        }

        let (bytes, orientation) = self.compute(source, size, tone)?;

        if let Err(e) = layer.store.store(key, &bytes) {
            tracing::warn!("Failed to write cache entry {}: {}", key, e);
        }

        Ok(Self::photo(bytes, size, CacheStatus::Miss, Some(orientation)))
    }

    /// The uncached path: validate, decode, orient, fit, tone, encode.
    fn compute(
        &self,
        source: &[u8],
        size: &SizeSpec,
        tone: &ToneParams,
    ) -> PipelineResult<(Vec<u8>, OrientationOutcome)> {
        let start = Instant::now();

        self.validator.validate(source)?;
        tracing::trace!("  Validate: {:?}", start.elapsed());

        let decode_start = Instant::now();
        let decoded = self.decoder.decode(source)?;
        let format = decoded.format;
        let (src_width, src_height) = (decoded.width, decoded.height);
        let (image, exif) = decoded.into_rgb8();
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());

        let orient_start = Instant::now();
        let oriented = self.orientation.correct(image, &exif);
        tracing::trace!("  Orientation: {:?}", orient_start.elapsed());

        let fit_start = Instant::now();
        let fitted = self.geometry.fit(oriented.image, size)?;
        tracing::trace!("  Fit: {:?}", fit_start.elapsed());

        let tone_start = Instant::now();
        let toned = self.tone.adjust(fitted, tone);
        tracing::trace!("  Tone: {:?}", tone_start.elapsed());

        let encode_start = Instant::now();
        let bytes = self.encoder.encode(&toned)?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        tracing::debug!(
            "Processed {} {}x{} -> {} {}x{} in {:?}",
            format_to_string(format),
            src_width,
            src_height,
            size.id,
            size.width,
            size.height,
            start.elapsed()
        );

        Ok((bytes, oriented.outcome))
    }

    fn photo(
        bytes: Vec<u8>,
        size: &SizeSpec,
        cache: CacheStatus,
        orientation: Option<OrientationOutcome>,
    ) -> ProcessedPhoto {
        ProcessedPhoto {
            bytes,
            content_type: JPEG_CONTENT_TYPE,
            width: size.width,
            height: size.height,
            size_id: size.id.clone(),
            cache,
            orientation,
        }
    }
}
