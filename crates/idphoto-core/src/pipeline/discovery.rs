//! Finds photographs among the paths given on the command line.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::config::ProcessingConfig;

/// Expands files and directories into the photographs they contain.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// A photograph found on disk.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Size in bytes at discovery time
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Photographs at one path.
    ///
    /// A file is returned as-is when its extension is supported. A directory
    /// is walked recursively, skipping hidden entries, and its files come
    /// back sorted by path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if !path.exists() {
            tracing::warn!("Input {:?} does not exist", path);
            return Vec::new();
        }

        if !path.is_dir() {
            if !self.is_supported(path) {
                tracing::warn!("Skipping {:?}: unsupported extension", path);
                return Vec::new();
            }
            return std::fs::metadata(path)
                .map(|meta| DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                })
                .into_iter()
                .collect();
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: entry.into_path(),
                    size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!("Found {} photographs under {:?}", files.len(), path);
        files
    }

    /// Photographs across several inputs, in argument order, each path once.
    pub fn discover_all(&self, paths: &[PathBuf]) -> Vec<DiscoveredFile> {
        let mut seen = HashSet::new();
        paths
            .iter()
            .flat_map(|p| self.discover(p))
            .filter(|f| seen.insert(f.path.clone()))
            .collect()
    }

    fn is_supported(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.config
            .supported_formats
            .iter()
            .any(|fmt| fmt.eq_ignore_ascii_case(ext))
    }

    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}
