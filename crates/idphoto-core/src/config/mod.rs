//! Configuration management for idphoto.
//!
//! Configuration is loaded from the platform config directory (falling back to
//! `~/.idphoto/config.toml`). Every section has defaults, so a missing file or
//! a partial file both work.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::types::SizeSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for idphoto.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker pool and discovery settings
    pub processing: ProcessingConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Geometry settings
    pub transform: TransformConfig,

    /// Tone adjustment settings
    pub tone: ToneConfig,

    /// Encoded output settings
    pub output: OutputConfig,

    /// Result cache settings
    pub cache: CacheConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Named print sizes, in listing order
    pub sizes: Vec<SizeSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig::default(),
            limits: LimitsConfig::default(),
            transform: TransformConfig::default(),
            tone: ToneConfig::default(),
            output: OutputConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
            sizes: default_sizes(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.idphoto.idphoto/config.toml
    /// - Linux: ~/.config/idphoto/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\idphoto\idphoto\config\config.toml
    ///
    /// Falls back to ~/.idphoto/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "idphoto", "idphoto")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".idphoto").join("config.toml")
            })
    }

    /// Get the resolved cache directory path (with ~ expansion).
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.resolved_dir()
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.processing.parallel_workers, 4);
        assert_eq!(config.limits.max_file_size_mb, 10);
        assert_eq!(config.output.jpeg_quality, 95);
        assert_eq!(config.cache.retention_days, 7);
        assert_eq!(config.sizes.len(), 5);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[processing]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[[sizes]]"));
    }

    #[test]
    fn test_toml_round_trip_preserves_sizes() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(parsed.sizes, config.sizes);
        assert_eq!(parsed.tone.contrast_pivot, config.tone.contrast_pivot);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [cache]
            retention_days = 3

            [tone]
            contrast_pivot = "mean_luminance"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.retention_days, 3);
        assert!(config.cache.enabled);
        assert_eq!(config.tone.contrast_pivot, ContrastPivot::MeanLuminance);
        assert_eq!(config.sizes.len(), 5);
    }

    #[test]
    fn test_custom_size_table_replaces_defaults() {
        let config = Config::from_toml(
            r#"
            [[sizes]]
            id = "visa"
            width = 600
            height = 600
            "#,
        )
        .unwrap();
        assert_eq!(config.sizes.len(), 1);
        assert_eq!(config.sizes[0].id, "visa");
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[processing]\nparallel_workers = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_load_from_missing_file_is_read_error() {
        let err = Config::load_from(Path::new("/nonexistent/idphoto.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }
}
