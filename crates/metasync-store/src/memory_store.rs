//! In-memory object storage backend.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// An object held by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object bytes.
    pub data: Bytes,
    /// Content type given at upload time.
    pub content_type: String,
}

/// In-memory object store backed by a `RwLock<HashMap>`.
///
/// Counts every `put` and `delete` call so tests can assert how many remote
/// mutations a run performed.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    puts: AtomicU64,
    deletes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object directly, bypassing the trait.
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(path).cloned()
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let map = self.objects.read().expect("lock poisoned");
        let mut paths: Vec<String> = map.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `put` calls served so far.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Number of `delete` calls served so far.
    pub fn delete_count(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        debug!(path, size = data.len(), "storing object in memory");
        let mut map = self.objects.write().expect("lock poisoned");
        map.insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.get(path).map(|o| o.data.clone()))
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(path);
        debug!(path, "deleted object from memory");
        Ok(())
    }
}
