//! Error types for the transfer core.
//!
//! Collaborator clients (namespaces and object stores) report failures as
//! `anyhow::Error`; the core classifies them into [`TransferError`] so callers
//! can tell a bad prefix from a failed read, a full disk or a rejected upload.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the transfer core.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Everything that can stop a single file from being shipped.
#[derive(Debug, Error)]
pub enum TransferError {
    /// A prefix did not end with exactly one `/`. Raised before any I/O.
    #[error("{which} prefix `{prefix}` must end with a single `/`")]
    Precondition { which: &'static str, prefix: String },

    /// Listing, opening or reading the source namespace failed.
    #[error("failed to read `{path}` from the source namespace")]
    RemoteRead {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Creating, writing, closing or reopening a local temp file failed.
    #[error("local I/O on `{}` failed", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The object store rejected the upload.
    #[error("failed to upload s3://{bucket}/{key}")]
    Upload {
        bucket: String,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Date naming was requested but the path carries no hourly date segment.
    #[error("no `<label>/hourly/<year>/<month>/<day>` segment in `{path}`")]
    NoDateMatch { path: String },

    /// A gzip sink was written to after `close`.
    #[error("gzip sink `{}` is already closed", path.display())]
    SinkClosed { path: PathBuf },
}

impl TransferError {
    pub(crate) fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        TransferError::LocalIo { path: path.into(), source }
    }

    pub(crate) fn remote_read(path: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        TransferError::RemoteRead { path: path.into(), source: source.into() }
    }
}

/// A batch (tree transfer) stopped early.
///
/// `completed` is the exact number of files fully uploaded before `source`
/// aborted the batch. Those uploads are not rolled back.
#[derive(Debug, Error)]
#[error("transfer aborted after {completed} file(s)")]
pub struct BatchError {
    pub completed: usize,
    #[source]
    pub source: TransferError,
}

impl BatchError {
    pub fn new(completed: usize, source: TransferError) -> Self {
        BatchError { completed, source }
    }
}

/// Check that a namespace or destination prefix ends with exactly one separator.
///
/// `out//` is rejected: joined with a name it would produce `out//name`.
pub fn require_trailing_separator(which: &'static str, prefix: &str) -> Result<()> {
    let sep = crate::constants::PATH_SEPARATOR;
    let trimmed = prefix.strip_suffix(sep);
    if matches!(trimmed, Some(rest) if !rest.ends_with(sep)) {
        Ok(())
    } else {
        Err(TransferError::Precondition { which, prefix: prefix.to_string() })
    }
}
