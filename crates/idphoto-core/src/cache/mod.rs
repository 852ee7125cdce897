//! Content-addressed filesystem cache of finished prints.
//!
//! One JPEG per entry at `{dir}/{hash}_{size}.jpg`. Entries are written to a
//! temp file in the same directory and renamed into place, so readers never
//! observe a half-written entry and concurrent writers of the same key simply
//! race to an identical result. The entry's modification time is its creation
//! timestamp and is taken from the injected [`Clock`].
//!
//! Nothing here fails a request: lookups degrade to [`CacheLookup::Miss`] and
//! store errors are returned for the caller to log.

mod clock;
mod key;
mod locks;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::CacheKey;
pub use locks::KeyLocks;

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use image::{GenericImageView, ImageFormat};
use serde::Serialize;

use crate::config::CacheConfig;
use crate::error::CacheError;

const ENTRY_EXTENSION: &str = "jpg";
const TEMP_PREFIX: &str = ".idphoto-";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Behavior knobs for [`ContentCache`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Entries strictly older than this are expired
    pub retention: Duration,
}

impl CacheSettings {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            retention: Duration::from_secs(config.retention_days * SECONDS_PER_DAY),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

/// A decoded-and-verified cache entry.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Why a lookup did not produce an entry.
#[derive(Debug)]
pub enum MissReason {
    /// No file for this key
    Absent,
    /// File exists but is older than the retention window
    Expired,
    /// File exists but is not a usable JPEG of the right size
    Unreadable(CacheError),
}

/// Outcome of [`ContentCache::lookup`].
#[derive(Debug)]
pub enum CacheLookup {
    Hit(CachedEntry),
    Miss(MissReason),
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

/// What a sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Files examined
    pub scanned: usize,
    /// Expired entries and abandoned temp files deleted
    pub removed: usize,
    /// Deletions that failed
    pub failed: usize,
}

/// What the cache directory currently holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiskUsage {
    pub entries: usize,
    pub bytes: u64,
    pub expired: usize,
}

/// Lookup and store counters since the cache was opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub store_failures: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} computed ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} computed", self.misses)
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    store_failures: AtomicU64,
}

/// Filesystem-backed store keyed by [`CacheKey`].
#[derive(Debug)]
pub struct ContentCache {
    dir: PathBuf,
    settings: CacheSettings,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl ContentCache {
    /// Open (creating if needed) a cache directory.
    pub fn open(
        dir: impl Into<PathBuf>,
        settings: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            settings,
            clock,
            counters: Counters::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Find a fresh, decodable entry of exactly `width x height`.
    pub fn lookup(&self, key: &CacheKey, width: u32, height: u32) -> CacheLookup {
        let result = self.lookup_inner(key, width, height);
        match &result {
            CacheLookup::Hit(_) => self.counters.hits.fetch_add(1, Ordering::Relaxed),
            CacheLookup::Miss(_) => self.counters.misses.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    fn lookup_inner(&self, key: &CacheKey, width: u32, height: u32) -> CacheLookup {
        let path = self.entry_path(key);

        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return CacheLookup::Miss(MissReason::Absent)
            }
            Err(source) => {
                return CacheLookup::Miss(MissReason::Unreadable(CacheError::Io { path, source }))
            }
        };

        if self.is_expired(modified) {
            return CacheLookup::Miss(MissReason::Expired);
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return CacheLookup::Miss(MissReason::Absent)
            }
            Err(source) => {
                return CacheLookup::Miss(MissReason::Unreadable(CacheError::Io { path, source }))
            }
        };

        let decoded = match image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg) {
            Ok(decoded) => decoded,
            Err(e) => {
                return CacheLookup::Miss(MissReason::Unreadable(CacheError::Corrupt {
                    path,
                    message: e.to_string(),
                }))
            }
        };

        let (actual_width, actual_height) = decoded.dimensions();
        if (actual_width, actual_height) != (width, height) {
            return CacheLookup::Miss(MissReason::Unreadable(CacheError::DimensionMismatch {
                path,
                expected_width: width,
                expected_height: height,
                actual_width,
                actual_height,
            }));
        }

        CacheLookup::Hit(CachedEntry {
            bytes,
            width,
            height,
        })
    }

    /// Atomically write an entry, replacing any existing one.
    pub fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let result = self.store_inner(key, bytes);
        match &result {
            Ok(_) => self.counters.stores.fetch_add(1, Ordering::Relaxed),
            Err(_) => self.counters.store_failures.fetch_add(1, Ordering::Relaxed),
        };
        result
    }

    fn store_inner(&self, key: &CacheKey, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.entry_path(key);
        let io_err = |source: io::Error| CacheError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".part")
            .tempfile_in(&self.dir)
            .map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.as_file()
            .set_modified(self.clock.now())
            .map_err(io_err)?;

        tmp.persist(&path).map_err(|e| CacheError::Persist {
            path: path.clone(),
            message: e.error.to_string(),
        })?;
        Ok(path)
    }

    /// Delete expired entries and abandoned temp files.
    pub fn sweep_expired(&self) -> Result<SweepReport, CacheError> {
        let mut report = SweepReport::default();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(report),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            report.scanned += 1;
            if !self.is_expired(modified) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("Removed expired cache file {:?}", path);
                    report.removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to remove expired cache file {:?}: {}", path, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Delete every entry regardless of age. Returns the number removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Io { path, source }),
            }
        }
        Ok(removed)
    }

    /// Number of entries currently on disk, fresh or not.
    pub fn entry_count(&self) -> usize {
        self.disk_usage().entries
    }

    /// Entries on disk, their total size, and how many are past retention.
    pub fn disk_usage(&self) -> DiskUsage {
        let mut usage = DiskUsage::default();
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return usage;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if !is_entry(&entry.path()) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            usage.entries += 1;
            usage.bytes += metadata.len();
            if metadata.modified().is_ok_and(|m| self.is_expired(m)) {
                usage.expired += 1;
            }
        }
        usage
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stores: self.counters.stores.load(Ordering::Relaxed),
            store_failures: self.counters.store_failures.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, modified: SystemTime) -> bool {
        let age = self
            .clock
            .now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        age > self.settings.retention
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

fn is_temp(path: &Path) -> bool {
    file_name(path).is_some_and(|n| n.starts_with(TEMP_PREFIX))
}

fn is_entry(path: &Path) -> bool {
    !is_temp(path) && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION)
}

fn is_cache_file(path: &Path) -> bool {
    path.is_file() && (is_entry(path) || is_temp(path))
}
