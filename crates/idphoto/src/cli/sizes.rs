//! The `idphoto sizes` command.

use std::io::Write;

use clap::Args;
use idphoto_core::{Config, SizeCatalog, SizeSpec};

/// Arguments for the `sizes` command.
#[derive(Args, Debug)]
pub struct SizesArgs {
    /// Print the catalog as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: SizesArgs, config: &Config) -> anyhow::Result<()> {
    let catalog = SizeCatalog::new(config.sizes.clone())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if args.json {
        serde_json::to_writer_pretty(&mut out, catalog.list())?;
        writeln!(out)?;
    } else {
        write_table(&mut out, catalog.list())?;
    }
    Ok(())
}

fn write_table<W: Write>(out: &mut W, sizes: &[SizeSpec]) -> std::io::Result<()> {
    let id_width = sizes
        .iter()
        .map(|s| s.id.chars().count())
        .max()
        .unwrap_or(0)
        .max(2);

    writeln!(out, "{:<id_width$}  {:>11}  {:>6}", "ID", "PIXELS", "RATIO")?;
    for size in sizes {
        let pad = id_width - size.id.chars().count();
        writeln!(
            out,
            "{}{}  {:>11}  {:>6.3}",
            size.id,
            " ".repeat(pad),
            format!("{}x{}", size.width, size.height),
            size.aspect_ratio()
        )?;
    }
    Ok(())
}
