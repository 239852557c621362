//! Loading and persisting the manifest through an [`ObjectStore`].

use std::sync::Arc;

use bytes::Bytes;
use metasync_store::ObjectStore;
use metasync_types::APPLICATION_GZIP;
use tracing::{info, warn};

use crate::error::StateError;
use crate::manifest::Manifest;

/// Well-known object path of the manifest.
pub const DEFAULT_MANIFEST_PATH: &str = "_manifest_01.gz";

/// Reads and writes the manifest object.
///
/// `save` writes the whole blob with a single `put`, so atomicity is that of
/// one object replacement in the backing store: a later `load` sees either
/// the previous manifest or the new one, never a mix.
pub struct ManifestStore {
    store: Arc<dyn ObjectStore>,
    path: String,
}

impl ManifestStore {
    /// Bind to the manifest object at `path` in `store`.
    pub fn new(store: Arc<dyn ObjectStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
        }
    }

    /// Object path of the manifest.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Load the previous manifest, or an empty one on the first run.
    pub async fn load(&self) -> Result<Manifest, StateError> {
        let Some(bytes) = self.store.get(&self.path).await? else {
            warn!(path = %self.path, "no previous manifest found, all files will be uploaded");
            return Ok(Manifest::new());
        };
        let manifest = Manifest::decode(&bytes)?;
        info!(entries = manifest.len(), "loaded previous hashes from the manifest");
        Ok(manifest)
    }

    /// Persist `manifest`, replacing the previous one.
    pub async fn save(&self, manifest: &Manifest) -> Result<(), StateError> {
        let bytes = manifest.encode()?;
        let size = bytes.len();
        self.store
            .put(&self.path, Bytes::from(bytes), APPLICATION_GZIP)
            .await?;
        info!(entries = manifest.len(), size, "manifest saved");
        Ok(())
    }
}
