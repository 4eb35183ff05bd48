use std::fs;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;

use crate::models::EntryMetadata;
use crate::namespace::Namespace;

/// Namespace backed by the local filesystem.
///
/// Namespace paths are joined onto `root`, so `/logs/` with a root of
/// `/mnt/hdfs` lists `/mnt/hdfs/logs/`. With the default root of `/` the
/// namespace paths are plain local paths.
#[derive(Debug, Clone)]
pub struct LocalNamespace {
    root: PathBuf,
}

impl Default for LocalNamespace {
    fn default() -> Self {
        LocalNamespace { root: PathBuf::from("/") }
    }
}

impl LocalNamespace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalNamespace { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Namespace for LocalNamespace {
    fn list_directory(&self, path: &str) -> Result<Vec<EntryMetadata>> {
        let dir = self.resolve(path);
        let entries = fs::read_dir(&dir)
            .context(format!("Failed to read directory: {}", dir.display()))?;

        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let entry_path = entry.path();
            // Follow symlinks so a linked directory is walked, not opened.
            // A dangling link keeps its own metadata and fails on open.
            let metadata = fs::metadata(&entry_path)
                .or_else(|_| entry.metadata())
                .context(format!("Failed to get metadata for {}", entry_path.display()))?;

            listing.push(EntryMetadata {
                name: entry.file_name().to_string_lossy().to_string(),
                is_directory: metadata.is_dir(),
                size: if metadata.is_dir() { None } else { Some(metadata.len()) },
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        // read_dir order is platform dependent
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        debug!("Listed {} entries under {}", listing.len(), dir.display());
        Ok(listing)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let file_path = self.resolve(path);
        let file = fs::File::open(&file_path)
            .context(format!("Failed to open {} for reading", file_path.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }
}
