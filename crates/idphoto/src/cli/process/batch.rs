//! Batch processing: a bounded window of in-flight files, progress, and
//! streaming reports.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use idphoto_core::pipeline::DiscoveredFile;
use idphoto_core::{
    CacheStats, CacheStatus, IdPhotoError, OutputFormat, OutputWriter, PhotoReport, PhotoService,
    ProcessRequest, SizeSelection, ToneParams,
};
use tokio::task::JoinSet;

/// What every file in the run is turned into.
#[derive(Debug)]
pub struct Job {
    pub selection: SizeSelection,
    pub tone: ToneParams,
    pub output_dir: PathBuf,
    pub data_uri: bool,
}

/// Counts for the end-of-run summary.
#[derive(Debug, Default)]
pub struct Summary {
    pub succeeded: u64,
    pub failed: u64,
    pub cached: u64,
    pub elapsed: Duration,
}

impl Summary {
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }

    fn record(&mut self, report: &PhotoReport) {
        if report.is_success() {
            self.succeeded += 1;
            if report.cache == Some(CacheStatus::Hit) {
                self.cached += 1;
            }
        } else {
            self.failed += 1;
        }
    }

    fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Process every file, writing one report per file.
///
/// At most twice the worker count of files are read into memory at once.
/// JSONL reports are written as files finish. A JSON array is written once
/// at the end, in input order.
pub async fn run_batch<W: Write>(
    service: Arc<PhotoService>,
    job: Arc<Job>,
    files: Vec<DiscoveredFile>,
    writer: &mut OutputWriter<W>,
    show_progress: bool,
) -> anyhow::Result<Summary> {
    let progress = if show_progress {
        create_progress_bar(files.len() as u64)
    } else {
        indicatif::ProgressBar::hidden()
    };

    let window = service.parallel_workers() * 2;
    let start_time = Instant::now();
    let mut summary = Summary::default();
    let mut collected: Vec<(usize, PhotoReport)> = Vec::new();
    let mut pending = files.into_iter().enumerate();
    let mut tasks = JoinSet::new();

    loop {
        while tasks.len() < window {
            let Some((index, file)) = pending.next() else {
                break;
            };
            let service = service.clone();
            let job = job.clone();
            tasks.spawn(async move { (index, process_file(&service, &job, &file.path).await) });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        let (index, report) = joined.map_err(|e| anyhow::anyhow!("processing task failed: {e}"))?;

        if let Some(error) = &report.error {
            tracing::error!("Failed: {:?} - {}", report.input, error.message);
        }
        summary.record(&report);

        match writer.format() {
            OutputFormat::JsonLines => writer.write(&report)?,
            OutputFormat::Json => collected.push((index, report)),
        }

        progress.inc(1);
        summary.elapsed = start_time.elapsed();
        progress.set_message(format!("{:.1} photos/sec", summary.rate()));
    }

    if writer.format() == OutputFormat::Json {
        collected.sort_by_key(|(index, _)| *index);
        let reports: Vec<PhotoReport> = collected.into_iter().map(|(_, r)| r).collect();
        writer.write_all(&reports)?;
    }
    writer.flush()?;

    summary.elapsed = start_time.elapsed();
    progress.finish_and_clear();
    Ok(summary)
}

async fn process_file(service: &PhotoService, job: &Job, input: &Path) -> PhotoReport {
    let bytes = match tokio::fs::read(input).await {
        Ok(bytes) => bytes,
        Err(e) => return PhotoReport::failure(input, &IdPhotoError::Io(e)),
    };

    let request = ProcessRequest::new(bytes, job.selection.clone()).with_tone(job.tone);
    let photo = match service.process(request).await {
        Ok(photo) => photo,
        Err(e) => return PhotoReport::failure(input, &e),
    };

    let output = job.output_dir.join(output_file_name(input, &photo.size_id));
    if let Err(e) = tokio::fs::write(&output, &photo.bytes).await {
        return PhotoReport::failure(input, &IdPhotoError::Io(e));
    }
    tracing::debug!("Wrote {:?} ({:?})", output, photo.cache);

    PhotoReport::success(input, Some(output), &photo, job.data_uri)
}

/// `{stem}_{size id}.jpg`, with path separators in the id replaced.
fn output_file_name(input: &Path, size_id: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_else(|| "photo".into());
    format!("{}_{}.jpg", stem, size_id.replace(['/', '\\'], "_"))
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
pub fn print_summary(summary: &Summary, cache: Option<CacheStats>) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total());
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed.as_secs_f64());
    eprintln!("    Rate:         {:>7.1} photos/sec", summary.rate());
    match cache {
        Some(stats) => eprintln!("    Cache:        {}", stats),
        None => eprintln!("    Cache:        disabled"),
    }
    eprintln!("  ====================================");
}
