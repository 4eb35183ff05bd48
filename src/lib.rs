//! # hdfs-shipper
//!
//! Ships directory trees from HDFS (or a local filesystem) to S3-compatible
//! object storage, one file at a time, optionally gzip-compressing each file
//! on the way.
//!
//! ## Overview
//!
//! A transfer walks every file under a source prefix, derives a destination
//! key for it and streams it into the object store. With compression on, the
//! file is first gzipped into a temp file that is removed once the upload is
//! done, whether it succeeded or not.
//!
//! Destination keys come in two shapes:
//!
//! - `<dest_prefix><millis><name>`
//! - `<dest_prefix><label>/<yyyymmdd>/<millis><name>` for files under a
//!   `<label>/hourly/<year>/<month>/<day>/` partition
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use hdfs_shipper::cloud::s3::S3ObjectStore;
//! use hdfs_shipper::namespace::webhdfs::WebHdfsNamespace;
//! use hdfs_shipper::naming::SystemClock;
//! use hdfs_shipper::transfer::{TransferOptions, TransferPipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let timeout = Duration::from_secs(300);
//! let namespace = WebHdfsNamespace::new("http://namenode:9870", Some("etl"), timeout)?;
//! let store = S3ObjectStore::new(Some("us-east-1"), None, None, timeout)?;
//!
//! let pipeline = TransferPipeline::new(namespace, store, Arc::new(SystemClock), TransferOptions::default());
//! let shipped = pipeline.transfer_tree("/data/clicks/", "archive/clicks/", "logs-bucket", true, true)?;
//!
//! println!("Shipped {} files", shipped);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`transfer`]: the per-file pipeline and batch loop
//! - [`walker`]: recursive enumeration of a namespace
//! - [`naming`]: destination key derivation and the clock it uses
//! - [`namespace`]: sources (local filesystem, WebHDFS)
//! - [`cloud`]: object stores (S3, in-memory)
//! - [`utils`]: the gzip sink and temp-file guard
//! - [`config`]: YAML configuration for the binary
//! - [`error`]: error kinds reported by the core

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Directory listing and file entry models
pub mod models;

/// Error kinds reported by the transfer core
pub mod error;

/// Application constants and configuration values
pub mod constants;

/// Destination key derivation
pub mod naming;

/// Source namespaces
pub mod namespace;

/// Recursive tree enumeration
pub mod walker;

/// Gzip sink and temp-file handling
pub mod utils;

/// Object storage targets (S3, memory)
pub mod cloud;

/// Configuration management
pub mod config;

/// Tree transfer pipeline
pub mod transfer;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
