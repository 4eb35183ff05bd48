//! Tree transfer pipeline.
//!
//! For every file under a source prefix the pipeline walks these states:
//!
//! ```text
//! Pending -> SourceOpened -> [Compressing] -> Uploading -> Uploaded -> TempCleaned -> Done
//! ```
//!
//! Any step can fail. The failing file stops where it is, its temp artifact
//! is still removed, and the batch aborts. Files uploaded earlier stay
//! uploaded; the caller learns how many through [`BatchError::completed`].

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::cloud::ObjectStore;
use crate::constants::GZIP_SUFFIX;
use crate::error::{require_trailing_separator, BatchError, Result, TransferError};
use crate::models::FileEntry;
use crate::namespace::Namespace;
use crate::naming::{Clock, PathNamer};
use crate::utils::compress::GzipSink;
use crate::utils::temp::TempArtifact;
use crate::walker::TreeWalker;

/// What to do with a file whose path has no hourly date segment when date
/// naming is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingDatePolicy {
    /// Fail the batch with `TransferError::NoDateMatch`
    #[default]
    Abort,
    /// Log a warning and move on; the file is not counted
    Skip,
}

/// Knobs for a [`TransferPipeline`].
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Directory for compressed temp artifacts
    pub temp_dir: PathBuf,
    pub missing_date: MissingDatePolicy,
}

impl Default for TransferOptions {
    fn default() -> Self {
        TransferOptions {
            temp_dir: std::env::temp_dir(),
            missing_date: MissingDatePolicy::default(),
        }
    }
}

enum FileOutcome {
    Uploaded,
    Skipped,
}

/// Ships files from a [`Namespace`] into an [`ObjectStore`], one at a time.
pub struct TransferPipeline<N, S> {
    namespace: N,
    store: S,
    clock: Arc<dyn Clock>,
    options: TransferOptions,
}

impl<N: Namespace, S: ObjectStore> TransferPipeline<N, S> {
    pub fn new(namespace: N, store: S, clock: Arc<dyn Clock>, options: TransferOptions) -> Self {
        TransferPipeline { namespace, store, clock, options }
    }

    pub fn namespace(&self) -> &N {
        &self.namespace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Ship every file under `source_prefix` to `bucket` below `dest_prefix`.
    ///
    /// Returns the number of files uploaded. Both prefixes must end with `/`.
    pub fn transfer_tree(
        &self,
        source_prefix: &str,
        dest_prefix: &str,
        bucket: &str,
        use_compression: bool,
        use_date_naming: bool,
    ) -> std::result::Result<usize, BatchError> {
        let namer = require_trailing_separator("source", source_prefix)
            .and_then(|_| PathNamer::new(dest_prefix, Arc::clone(&self.clock)))
            .map_err(|e| BatchError::new(0, e))?;

        let entries = TreeWalker::new(&self.namespace)
            .walk(source_prefix)
            .map_err(|e| {
                error!("Failed to list {}: {}", source_prefix, e);
                BatchError::new(0, e)
            })?;

        info!("{} files under {} to ship to s3://{}/{}",
              entries.len(), source_prefix, bucket, dest_prefix);

        let mut completed = 0;
        for entry in &entries {
            match self.transfer_file(entry, &namer, bucket, use_compression, use_date_naming) {
                Ok(FileOutcome::Uploaded) => completed += 1,
                Ok(FileOutcome::Skipped) => {},
                Err(e) => {
                    error!("Transfer of {} failed after {} file(s): {}", entry.full_path(), completed, e);
                    return Err(BatchError::new(completed, e));
                }
            }
        }

        info!("Shipped {} of {} files from {}", completed, entries.len(), source_prefix);
        Ok(completed)
    }

    /// Same as [`transfer_tree`](Self::transfer_tree) with date naming forced on.
    pub fn migrate_tree(
        &self,
        source_prefix: &str,
        dest_prefix: &str,
        bucket: &str,
        use_compression: bool,
    ) -> std::result::Result<usize, BatchError> {
        self.transfer_tree(source_prefix, dest_prefix, bucket, use_compression, true)
    }

    /// Gzip `text` and upload it under `<dest_prefix><yyyymmdd>/<millis>.gz`.
    ///
    /// Returns the key the object was stored under.
    pub fn write_string_as_compressed_object(&self, text: &str, dest_prefix: &str, bucket: &str) -> Result<String> {
        let namer = PathNamer::new(dest_prefix, Arc::clone(&self.clock))?;
        let millis = self.clock.now_millis();
        let key = namer.date_folder_key(millis, GZIP_SUFFIX);

        let temp_path = self.options.temp_dir.join(millis.to_string());
        let sink = GzipSink::create(&temp_path)?;
        let artifact = TempArtifact::new(temp_path);

        let result = self.stage_string(sink, text)
            .and_then(|size| self.upload_local(artifact.path(), size, bucket, &key));
        artifact.cleanup();

        result?;
        info!("Uploaded {} bytes of text to s3://{}/{}", text.len(), bucket, key);
        Ok(key)
    }

    fn transfer_file(
        &self,
        entry: &FileEntry,
        namer: &PathNamer,
        bucket: &str,
        use_compression: bool,
        use_date_naming: bool,
    ) -> Result<FileOutcome> {
        let source_path = entry.full_path();
        debug!("{}: pending", source_path);

        let object_name = if use_compression {
            format!("{}{}", entry.name, GZIP_SUFFIX)
        } else {
            entry.name.clone()
        };

        let key = match namer.derive_key(&source_path, &object_name, use_date_naming) {
            Ok(key) => key,
            Err(TransferError::NoDateMatch { path }) if self.options.missing_date == MissingDatePolicy::Skip => {
                warn!("Skipping {}: no hourly date segment in path", path);
                return Ok(FileOutcome::Skipped);
            },
            Err(e) => return Err(e),
        };

        if use_compression {
            self.ship_compressed(entry, &source_path, &key, bucket)?;
        } else {
            self.ship_raw(entry, &source_path, &key, bucket)?;
        }

        debug!("{}: done", source_path);
        Ok(FileOutcome::Uploaded)
    }

    /// Source -> gzip temp artifact -> upload -> remove artifact
    fn ship_compressed(&self, entry: &FileEntry, source_path: &str, key: &str, bucket: &str) -> Result<()> {
        let mut source = self.namespace
            .open_read(source_path)
            .map_err(|e| TransferError::remote_read(source_path, e))?;
        debug!("{}: source opened", source_path);

        // Only a file this sink created is ever removed again
        let temp_path = self.options.temp_dir.join(format!("{}{}", entry.name, GZIP_SUFFIX));
        let sink = GzipSink::create(&temp_path)?;
        let artifact = TempArtifact::new(temp_path);

        let result = self.stage_compressed(sink, &mut *source, source_path)
            .and_then(|size| self.upload_local(artifact.path(), size, bucket, key));
        drop(source);

        artifact.cleanup();
        debug!("{}: temp cleaned", source_path);
        result
    }

    /// Source -> upload, no local copy
    fn ship_raw(&self, entry: &FileEntry, source_path: &str, key: &str, bucket: &str) -> Result<()> {
        let mut source = self.namespace
            .open_read(source_path)
            .map_err(|e| TransferError::remote_read(source_path, e))?;
        debug!("{}: source opened, uploading", source_path);

        self.store
            .put_object(bucket, key, &mut *source, entry.size_hint)
            .map_err(|e| TransferError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: e,
            })?;

        info!("Shipped {} to s3://{}/{}", source_path, bucket, key);
        Ok(())
    }

    /// Compress `source` through `sink`; returns the compressed size.
    fn stage_compressed(&self, mut sink: GzipSink, source: &mut dyn Read, source_path: &str) -> Result<u64> {
        debug!("{}: compressing into {}", source_path, sink.path().display());

        let copied = sink.copy_from(source, source_path)?;
        sink.close()?;

        let compressed = compressed_size(sink.path())?;
        info!("Compressed {} ({} bytes -> {} bytes)", source_path, copied, compressed);
        Ok(compressed)
    }

    fn stage_string(&self, mut sink: GzipSink, text: &str) -> Result<u64> {
        let written = sink.write_str(text)?;
        sink.close()?;

        debug!("Has written {} bytes to temp file {}", written, sink.path().display());
        compressed_size(sink.path())
    }

    fn upload_local(&self, temp_path: &Path, size: u64, bucket: &str, key: &str) -> Result<()> {
        let mut file = File::open(temp_path).map_err(|e| TransferError::local_io(temp_path, e))?;
        debug!("{}: uploading to s3://{}/{}", temp_path.display(), bucket, key);

        self.store
            .put_object(bucket, key, &mut file, Some(size))
            .map_err(|e| TransferError::Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                source: e,
            })?;

        debug!("{}: uploaded", temp_path.display());
        Ok(())
    }
}

fn compressed_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| TransferError::local_io(path, e))
}
