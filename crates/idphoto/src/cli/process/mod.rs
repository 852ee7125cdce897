//! The `idphoto process` command.

mod batch;
pub mod types;

pub use types::OutputFormat;

use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgGroup, Args};
use idphoto_core::pipeline::FileDiscovery;
use idphoto_core::{Config, OutputWriter, PhotoService, SizeSelection, ToneParams};

use batch::{print_summary, run_batch, Job};

/// Arguments for the `process` command.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["size", "width"])))]
pub struct ProcessArgs {
    /// Image files or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Named print size (see `idphoto sizes`)
    #[arg(short, long)]
    pub size: Option<String>,

    /// Custom output width in pixels
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Custom output height in pixels
    #[arg(long, requires = "width")]
    pub height: Option<u32>,

    /// Brightness multiplier (1.0 = unchanged)
    #[arg(long, default_value_t = 1.0)]
    pub brightness: f32,

    /// Contrast multiplier (1.0 = unchanged)
    #[arg(long, default_value_t = 1.0)]
    pub contrast: f32,

    /// Directory the JPEGs are written to
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Number of parallel workers (overrides processing.parallel_workers)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Bypass the result cache for this run
    #[arg(long)]
    pub no_cache: bool,

    /// Embed each result as a base64 data URI in its report
    #[arg(long)]
    pub data_uri: bool,
}

impl ProcessArgs {
    fn selection(&self) -> anyhow::Result<SizeSelection> {
        match (&self.size, self.width, self.height) {
            (Some(id), _, _) => Ok(SizeSelection::Named(id.clone())),
            (None, Some(width), Some(height)) => Ok(SizeSelection::Custom { width, height }),
            _ => anyhow::bail!("either --size or both --width and --height are required"),
        }
    }

    fn tone(&self) -> ToneParams {
        ToneParams::new(self.brightness, self.contrast)
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel.max(1);
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
    }
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply_overrides(&mut config);

    let selection = args.selection()?;
    let tone = args.tone();
    tone.validate()?;

    let mut service = PhotoService::from_config(&config)?;
    let size = service.pipeline().resolve(&selection)?;

    let files = FileDiscovery::new(config.processing.clone()).discover_all(&args.inputs);
    if files.is_empty() {
        anyhow::bail!("No supported images found in {:?}", args.inputs);
    }
    tracing::info!(
        "Processing {} images ({:.1} MB) into {} ({}x{})",
        files.len(),
        FileDiscovery::total_size(&files) as f64 / 1_000_000.0,
        size.id,
        size.width,
        size.height
    );

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    service.spawn_sweeper(Duration::from_secs(config.cache.sweep_interval_secs));
    let service = Arc::new(service);

    let job = Arc::new(Job {
        selection,
        tone,
        output_dir: args.output_dir.clone(),
        data_uri: args.data_uri,
    });

    let show_progress = files.len() > 1;
    let mut writer = OutputWriter::new(
        BufWriter::new(std::io::stdout()),
        args.format.into(),
        true,
    );
    let summary = run_batch(service.clone(), job, files, &mut writer, show_progress).await?;

    if show_progress {
        print_summary(&summary, service.pipeline().cache().map(|c| c.stats()));
    }

    if summary.failed > 0 {
        anyhow::bail!("{} of {} inputs failed", summary.failed, summary.total());
    }
    Ok(())
}
