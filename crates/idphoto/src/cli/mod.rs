//! Subcommand implementations.

pub mod cache;
pub mod config;
pub mod process;
pub mod sizes;

use std::path::Path;

use anyhow::Context;
use idphoto_core::Config;

/// Load configuration for a run.
///
/// An explicit `--config` file must load cleanly. A broken file at the
/// default location only warns, and the run continues with defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `idphoto config path`."
            );
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[output]\njpeg_quality = 80\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.output.jpeg_quality, 80);
    }

    #[test]
    fn test_explicit_config_errors_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());

        let invalid = dir.path().join("invalid.toml");
        std::fs::write(&invalid, "[output]\njpeg_quality = 0\n").unwrap();
        assert!(load_config(Some(&invalid)).is_err());
    }
}
