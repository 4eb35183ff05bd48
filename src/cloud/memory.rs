use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use log::info;

use crate::cloud::ObjectStore;

type ObjectMap = BTreeMap<(String, String), Vec<u8>>;

/// Object store that keeps every object in memory.
///
/// Used by `--dry-run` to exercise the full pipeline without credentials,
/// and by tests to inspect what would have been uploaded.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<ObjectMap>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, ObjectMap> {
        self.objects.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Contents of `bucket/key`, if uploaded.
    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects().get(&(bucket.to_string(), key.to_string())).cloned()
    }

    /// Keys stored in `bucket`, in lexical order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read, _size_hint: Option<u64>) -> Result<()> {
        let mut contents = Vec::new();
        body.read_to_end(&mut contents)
            .context(format!("Failed to read body for {}/{}", bucket, key))?;

        info!("Stored {} bytes as memory://{}/{}", contents.len(), bucket, key);
        self.objects().insert((bucket.to_string(), key.to_string()), contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let store = MemoryObjectStore::new();
        let mut body: &[u8] = b"payload";

        store.put_object("bucket", "a/b", &mut body, Some(7)).unwrap();

        assert_eq!(store.get("bucket", "a/b"), Some(b"payload".to_vec()));
        assert_eq!(store.get("other", "a/b"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_replaces_object() {
        let store = MemoryObjectStore::new();
        store.put_object("bucket", "k", &mut &b"one"[..], None).unwrap();
        store.put_object("bucket", "k", &mut &b"two"[..], None).unwrap();

        assert_eq!(store.get("bucket", "k"), Some(b"two".to_vec()));
        assert_eq!(store.keys("bucket"), vec!["k".to_string()]);
    }

    #[test]
    fn test_keys_filtered_by_bucket() {
        let store = MemoryObjectStore::new();
        store.put_object("b1", "z", &mut &b""[..], None).unwrap();
        store.put_object("b1", "a", &mut &b""[..], None).unwrap();
        store.put_object("b2", "m", &mut &b""[..], None).unwrap();

        assert_eq!(store.keys("b1"), vec!["a".to_string(), "z".to_string()]);
        assert!(!store.is_empty());
    }
}
