//! The `idphoto cache` command for cache maintenance.

use std::sync::Arc;

use clap::{Args, Subcommand};
use idphoto_core::cache::{CacheSettings, SystemClock};
use idphoto_core::{Config, ContentCache, DiskUsage};

/// Arguments for the `cache` command.
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Subcommands for cache maintenance.
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show the cache directory
    Path,

    /// Show how many entries are stored and how much space they use
    Stats,

    /// Delete entries older than the retention window
    Sweep,

    /// Delete every entry
    Clear,
}

pub fn execute(args: CacheArgs, config: &Config) -> anyhow::Result<()> {
    let open = || {
        ContentCache::open(
            config.cache_dir(),
            CacheSettings::from_config(&config.cache),
            Arc::new(SystemClock),
        )
    };

    match args.command {
        CacheCommand::Path => {
            println!("{}", config.cache_dir().display());
        }
        CacheCommand::Stats => {
            let cache = open()?;
            println!("{}", describe_usage(&cache.disk_usage(), config.cache.retention_days));
        }
        CacheCommand::Sweep => {
            let report = open()?.sweep_expired()?;
            tracing::debug!("Sweep report: {:?}", report);
            println!("Removed {} of {} files", report.removed, report.scanned);
            if report.failed > 0 {
                anyhow::bail!("{} files could not be removed", report.failed);
            }
        }
        CacheCommand::Clear => {
            let cache = open()?;
            let removed = cache.clear()?;
            println!("Removed {} files from {}", removed, cache.dir().display());
        }
    }

    Ok(())
}

fn describe_usage(usage: &DiskUsage, retention_days: u64) -> String {
    format!(
        "{} entries, {:.1} MB ({} older than {} days)",
        usage.entries,
        usage.bytes as f64 / 1_000_000.0,
        usage.expired,
        retention_days
    )
}
