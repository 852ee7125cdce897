//! Sub-configuration structs and their defaults.

use crate::types::SizeSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of pipeline runs allowed at once
    pub parallel_workers: usize,

    /// File extensions picked up by directory discovery
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
            ],
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum input size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum decoded image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 10,
            max_image_dimension: 10000,
        }
    }
}

/// Geometry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Longest side allowed before cropping; larger inputs are downscaled first
    pub pre_shrink_max: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            pre_shrink_max: 1000,
        }
    }
}

/// Value the contrast step stretches pixels away from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContrastPivot {
    /// Fixed pivot at 128
    #[default]
    MidGray,
    /// Rounded mean luma of the image being adjusted
    MeanLuminance,
}

/// Tone adjustment settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneConfig {
    pub contrast_pivot: ContrastPivot,
}

/// Encoded output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality, 1..=100
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Disable to always recompute
    pub enabled: bool,

    /// Directory holding cached JPEGs (supports `~`)
    pub dir: String,

    /// Entries older than this many days are removed by the sweep
    pub retention_days: u64,

    /// Seconds between background sweeps in the worker pool
    pub sweep_interval_secs: u64,

    /// Serialize concurrent runs for the same key so they compute once
    pub single_flight: bool,

    /// Append non-identity brightness/contrast to the cache key
    pub key_includes_tone: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "~/.idphoto/cache".to_string(),
            retention_days: 7,
            sweep_interval_secs: 3600,
            single_flight: true,
            key_includes_tone: false,
        }
    }
}

impl CacheConfig {
    /// Resolved cache directory (with ~ expansion).
    pub fn resolved_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.dir);
        PathBuf::from(expanded.into_owned())
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// The five print sizes the service ships with.
pub fn default_sizes() -> Vec<SizeSpec> {
    vec![
        SizeSpec::new("一寸", 295, 413),
        SizeSpec::new("二寸", 413, 579),
        SizeSpec::new("小一寸", 260, 378),
        SizeSpec::new("护照", 330, 420),
        SizeSpec::new("身份证", 358, 441),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrast_pivot_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            pivot: ContrastPivot,
        }
        let w: Wrapper = toml::from_str(r#"pivot = "mean_luminance""#).unwrap();
        assert_eq!(w.pivot, ContrastPivot::MeanLuminance);
        let w: Wrapper = toml::from_str(r#"pivot = "mid_gray""#).unwrap();
        assert_eq!(w.pivot, ContrastPivot::MidGray);
    }

    #[test]
    fn test_cache_dir_expands_tilde() {
        let config = CacheConfig {
            dir: "/tmp/idphoto-cache".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolved_dir(), PathBuf::from("/tmp/idphoto-cache"));

        let config = CacheConfig::default();
        assert!(!config.resolved_dir().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_default_sizes_table() {
        let sizes = default_sizes();
        assert_eq!(sizes.len(), 5);
        assert_eq!(sizes[0].id, "一寸");
        assert_eq!((sizes[0].width, sizes[0].height), (295, 413));
        assert_eq!((sizes[4].width, sizes[4].height), (358, 441));
    }
}
