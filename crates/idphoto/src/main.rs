//! idphoto CLI - turn ordinary photographs into identity-photo prints.
//!
//! Every input is oriented, cropped to the print's aspect ratio, resized to
//! its exact pixel size and written as JPEG. Results are cached by content
//! hash, so reprocessing the same photo for the same size is free.
//!
//! # Usage
//!
//! ```bash
//! # One photo, passport size
//! idphoto process portrait.jpg --size 护照
//!
//! # A folder, custom size, a little brighter, JSONL reports
//! idphoto process ./photos --width 600 --height 800 --brightness 1.1 --format jsonl
//!
//! # Available sizes
//! idphoto sizes
//!
//! # Cache maintenance
//! idphoto cache sweep
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// idphoto - identity-photo pipeline.
#[derive(Parser, Debug)]
#[command(name = "idphoto")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, global = true, env = "IDPHOTO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Produce identity photos from image files or directories
    Process(cli::process::ProcessArgs),

    /// List the configured print sizes
    Sizes(cli::sizes::SizesArgs),

    /// Inspect and maintain the result cache
    Cache(cli::cache::CacheArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't up yet, so config warnings go straight to stderr.
    let config = cli::load_config(cli.config.as_deref())?;
    logging::init_from_config(&config.logging, cli.verbose, cli.json_logs);

    tracing::debug!("idphoto v{}", idphoto_core::VERSION);

    match cli.command {
        Commands::Process(args) => cli::process::execute(args, config).await,
        Commands::Sizes(args) => cli::sizes::execute(args, &config),
        Commands::Cache(args) => cli::cache::execute(args, &config),
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()),
    }
}
