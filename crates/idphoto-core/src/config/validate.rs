//! Configuration validation with range checks.

use crate::error::ConfigError;
use std::collections::HashSet;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.transform.pre_shrink_max == 0 {
            return Err(ConfigError::ValidationError(
                "transform.pre_shrink_max must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "output.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.cache.retention_days == 0 {
            return Err(ConfigError::ValidationError(
                "cache.retention_days must be > 0".into(),
            ));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.sweep_interval_secs must be > 0".into(),
            ));
        }
        self.validate_sizes()
    }

    fn validate_sizes(&self) -> Result<(), ConfigError> {
        if self.sizes.is_empty() {
            return Err(ConfigError::ValidationError(
                "sizes must contain at least one entry".into(),
            ));
        }

        let mut seen = HashSet::new();
        for size in &self.sizes {
            if size.id.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "sizes.id must not be empty".into(),
                ));
            }
            if size.width == 0 || size.height == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "size '{}' must have width and height > 0",
                    size.id
                )));
            }
            if !seen.insert(size.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate size id '{}'",
                    size.id
                )));
            }
        }
        Ok(())
    }
}
