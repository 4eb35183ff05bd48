//! Source namespaces.
//!
//! A namespace is the hierarchical filesystem files are shipped *from*. The
//! transfer core only needs two operations from it: list one directory and
//! open one file for streaming reads. Recursion is built on top of
//! [`Namespace::list_directory`] by the [`crate::walker::TreeWalker`].
//!
//! ## Implementations
//!
//! - [`local::LocalNamespace`]: a locally mounted tree (NFS/FUSE mounts of
//!   HDFS, or plain directories)
//! - [`webhdfs::WebHdfsNamespace`]: HDFS through the WebHDFS REST API

use std::io::Read;

use anyhow::Result;

use crate::models::EntryMetadata;

/// Local filesystem namespace
pub mod local;

/// WebHDFS REST namespace
pub mod webhdfs;

/// Read-only view of a hierarchical filesystem.
pub trait Namespace {
    /// List the direct children of `path`, which ends with `/`.
    fn list_directory(&self, path: &str) -> Result<Vec<EntryMetadata>>;

    /// Open the file at `path` for streaming reads.
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>>;
}

impl<N: Namespace + ?Sized> Namespace for &N {
    fn list_directory(&self, path: &str) -> Result<Vec<EntryMetadata>> {
        (**self).list_directory(path)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        (**self).open_read(path)
    }
}

impl<N: Namespace + ?Sized> Namespace for Box<N> {
    fn list_directory(&self, path: &str) -> Result<Vec<EntryMetadata>> {
        (**self).list_directory(path)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        (**self).open_read(path)
    }
}
