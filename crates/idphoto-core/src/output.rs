//! Per-input reports and their JSON / JSONL serialization.

use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, IdPhotoError};
use crate::pipeline::OrientationOutcome;
use crate::types::{CacheStatus, ProcessedPhoto};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON array once every input is done
    Json,
    /// One JSON object per line, written as each input finishes
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoReport {
    pub input: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<OrientationOutcome>,

    /// `data:image/jpeg;base64,...` when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportedError>,
}

/// Failure details in a report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportedError {
    /// "input", "transform" or "internal"
    pub kind: &'static str,
    pub message: String,
}

impl PhotoReport {
    pub fn success(
        input: &Path,
        output: Option<PathBuf>,
        photo: &ProcessedPhoto,
        include_data_uri: bool,
    ) -> Self {
        Self {
            input: input.to_path_buf(),
            output,
            size_id: Some(photo.size_id.clone()),
            width: Some(photo.width),
            height: Some(photo.height),
            cache: Some(photo.cache),
            orientation: photo.orientation.clone(),
            data_uri: include_data_uri.then(|| photo.to_data_uri()),
            error: None,
        }
    }

    pub fn failure(input: &Path, error: &IdPhotoError) -> Self {
        let kind = match error {
            IdPhotoError::Pipeline(e) => match e.kind() {
                ErrorKind::Input => "input",
                ErrorKind::Transform => "transform",
            },
            _ => "internal",
        };
        Self {
            input: input.to_path_buf(),
            output: None,
            size_id: None,
            width: None,
            height: None,
            cache: None,
            orientation: None,
            data_uri: None,
            error: Some(ReportedError {
                kind,
                message: error.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A writer that serializes items to JSON or JSONL format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer. `pretty` only affects JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Write a single item as one object (JSON) or one line (JSONL).
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write multiple items: an array for JSON, one line each for JSONL.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, items)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, items).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.items_written += items.len();
            }
            OutputFormat::JsonLines => {
                for item in items {
                    self.write(item)?;
                }
            }
        }
        Ok(())
    }

    /// Get the number of items written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
