//! Object storage targets for shipped files.
//!
//! The transfer core hands every file to an [`ObjectStore`] as a byte stream.
//! Stores must consume the stream completely and make the object visible
//! atomically from the caller's point of view.
//!
//! ## Supported Stores
//!
//! - **Amazon S3**: S3 and S3-compatible services (custom endpoint), with
//!   single-request uploads for small bodies and streamed multipart uploads
//!   for large ones
//! - **Memory**: an in-process map, used for dry runs and tests
//!
//! ## Usage Example
//!
//! ```no_run
//! use hdfs_shipper::cloud::{ObjectStore, s3::S3ObjectStore};
//! use std::time::Duration;
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = S3ObjectStore::new(Some("us-east-1"), None, None, Duration::from_secs(300))?;
//! let mut body: &[u8] = b"hello";
//! store.put_object("archive-bucket", "logs/1700000000000hello.txt", &mut body, Some(5))?;
//! # Ok(())
//! # }
//! ```

use std::io::Read;
use std::sync::Arc;

use anyhow::Result;

/// S3 client construction
pub mod client;

/// Amazon S3 object store
pub mod s3;

/// In-memory object store
pub mod memory;

/// Destination for uploaded objects.
pub trait ObjectStore {
    /// Store everything read from `body` as `bucket/key`, replacing any
    /// existing object. `size_hint` is the expected body length when known.
    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read, size_hint: Option<u64>) -> Result<()>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read, size_hint: Option<u64>) -> Result<()> {
        (**self).put_object(bucket, key, body, size_hint)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read, size_hint: Option<u64>) -> Result<()> {
        (**self).put_object(bucket, key, body, size_hint)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read, size_hint: Option<u64>) -> Result<()> {
        (**self).put_object(bucket, key, body, size_hint)
    }
}
