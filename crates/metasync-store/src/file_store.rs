//! File-based object storage backend used for dry runs.
//!
//! Objects are written under a dump directory. A logical path such as
//! `v3/versions/game` is both a document and the prefix of other documents
//! (`v3/versions/game/hashed`), so JSON objects are stored as `<path>.json`
//! and everything else under its path verbatim.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use metasync_types::APPLICATION_JSON;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// File-based object store rooted at a dump directory.
///
/// Writes are atomic: data is written to a temporary file first, then
/// renamed into place, so a reader never observes a half-written object.
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new file store rooted at the given directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// The dump directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a logical path onto a file below the base directory.
    fn object_path(&self, path: &str, content_type: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let well_formed = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(StoreError::InvalidPath(path.to_string()));
        }

        let mut file = self.base_dir.join(relative).into_os_string();
        if content_type == APPLICATION_JSON {
            file.push(".json");
        }
        Ok(PathBuf::from(file))
    }

    /// Find the file backing `path`, whichever form it was written in.
    async fn existing_file(&self, path: &str) -> Result<Option<PathBuf>, StoreError> {
        for content_type in ["", APPLICATION_JSON] {
            let candidate = self.object_path(path, content_type)?;
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() => return Ok(Some(candidate)),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl ObjectStore for FileStore {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        let file = self.object_path(path, content_type)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = file.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &data).await?;
        tokio::fs::rename(&tmp, &file).await?;

        debug!(path, file = %file.display(), size = data.len(), "wrote object to dump dir");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        match self.existing_file(path).await? {
            Some(file) => Ok(Some(Bytes::from(tokio::fs::read(&file).await?))),
            None => Ok(None),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        if let Some(file) = self.existing_file(path).await? {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => debug!(path, "deleted object file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::Io(e)),
            }
        }
        Ok(())
    }
}
