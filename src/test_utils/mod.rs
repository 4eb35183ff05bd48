//! Test utilities for hdfs-shipper
//!
//! Fixture trees on disk, plus wrappers that make a namespace or an object
//! store fail on demand.

#![cfg(test)]

use anyhow::Result;
use std::fs;
use tempfile::{NamedTempFile, TempDir};

/// Creates a temporary directory that is automatically cleaned up
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a temporary file with the given content
pub fn create_temp_file(content: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    use std::io::Write;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

/// Creates a test file structure in a temporary directory
pub fn create_test_file_structure() -> Result<TempDir> {
    let temp_dir = create_temp_dir()?;
    let base_path = temp_dir.path();

    fs::create_dir_all(base_path.join("dir1/subdir1"))?;
    fs::create_dir_all(base_path.join("dir2"))?;

    fs::write(base_path.join("file1.txt"), b"Test content 1")?;
    fs::write(base_path.join("file2.log"), b"Test log content")?;
    fs::write(base_path.join("dir1/file3.txt"), b"Test content 3")?;
    fs::write(base_path.join("dir1/subdir1/file4.txt"), b"Test content 4")?;
    fs::write(base_path.join("dir2/file5.log"), b"Another log file")?;

    Ok(temp_dir)
}

/// Creates an hourly-partitioned tree plus one file outside any partition
///
/// ```text
/// clicks/hourly/2023/05/14/00/part-0   "clicks 0"
/// clicks/hourly/2023/05/14/01/part-1   "clicks 1"
/// clicks/hourly/2023/05/15/00/part-2   "clicks 2"
/// notes.txt                            "no date here"
/// ```
pub fn create_hourly_tree() -> Result<TempDir> {
    let temp_dir = create_temp_dir()?;
    let base_path = temp_dir.path();

    let files = [
        ("clicks/hourly/2023/05/14/00/part-0", "clicks 0"),
        ("clicks/hourly/2023/05/14/01/part-1", "clicks 1"),
        ("clicks/hourly/2023/05/15/00/part-2", "clicks 2"),
        ("notes.txt", "no date here"),
    ];
    for (path, content) in files {
        let full = base_path.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(full, content)?;
    }

    Ok(temp_dir)
}

/// Namespace and object store wrappers that fail on demand
mod flaky {
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};

    use crate::cloud::memory::MemoryObjectStore;
    use crate::cloud::ObjectStore;
    use crate::models::EntryMetadata;
    use crate::namespace::Namespace;

    /// Wraps a namespace and fails listing or opening selected paths
    pub struct FlakyNamespace<N> {
        inner: N,
        fail_list: Vec<String>,
        fail_open: Vec<String>,
        list_calls: AtomicUsize,
        opened: Mutex<Vec<String>>,
    }

    impl<N: Namespace> FlakyNamespace<N> {
        pub fn new(inner: N) -> Self {
            FlakyNamespace {
                inner,
                fail_list: Vec::new(),
                fail_open: Vec::new(),
                list_calls: AtomicUsize::new(0),
                opened: Mutex::new(Vec::new()),
            }
        }

        pub fn fail_list(mut self, path: &str) -> Self {
            self.fail_list.push(path.to_string());
            self
        }

        pub fn fail_open(mut self, path: &str) -> Self {
            self.fail_open.push(path.to_string());
            self
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        /// Every path `open_read` was called with, failed or not
        pub fn open_attempts(&self) -> Vec<String> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl<N: Namespace> Namespace for FlakyNamespace<N> {
        fn list_directory(&self, path: &str) -> Result<Vec<EntryMetadata>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list.iter().any(|p| p == path) {
                return Err(anyhow!("injected listing failure for {}", path));
            }
            self.inner.list_directory(path)
        }

        fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
            self.opened.lock().unwrap().push(path.to_string());
            if self.fail_open.iter().any(|p| p == path) {
                return Err(anyhow!("injected open failure for {}", path));
            }
            self.inner.open_read(path)
        }
    }

    /// Memory store that rejects every upload after the first `successes`
    pub struct FlakyStore {
        inner: MemoryObjectStore,
        successes: usize,
        attempts: AtomicUsize,
    }

    impl FlakyStore {
        pub fn failing_after(successes: usize) -> Self {
            FlakyStore {
                inner: MemoryObjectStore::new(),
                successes,
                attempts: AtomicUsize::new(0),
            }
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        pub fn stored(&self) -> &MemoryObjectStore {
            &self.inner
        }
    }

    impl ObjectStore for FlakyStore {
        fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read, size_hint: Option<u64>) -> Result<()> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt >= self.successes {
                return Err(anyhow!("injected upload failure for {}/{}", bucket, key));
            }
            self.inner.put_object(bucket, key, body, size_hint)
        }
    }
}

pub use flaky::{FlakyNamespace, FlakyStore};
