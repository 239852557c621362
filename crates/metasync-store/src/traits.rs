//! Core trait for object storage.

use bytes::Bytes;

use crate::error::StoreError;

/// Trait for the bucket-scoped object storage the pipeline publishes into.
///
/// Implementations are bound to a single bucket at construction time, so the
/// methods take only the object path. All implementations must be
/// `Send + Sync` for use across upload tasks.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object, replacing any previous version at `path`.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// Retrieve an object. Returns `None` if it does not exist.
    async fn get(&self, path: &str) -> Result<Option<Bytes>, StoreError>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}
