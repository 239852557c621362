//! Producers that fill an [`ArtifactSet`], and running them together.

use std::fs;
use std::path::{Path, PathBuf};

use metasync_types::{Artifact, content_type_for_extension};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::artifact_set::ArtifactSet;
use crate::error::BuildError;

/// A synchronous producer of artifacts.
///
/// Sources run in parallel against one shared set; a source may itself fan
/// out across threads.
pub trait ArtifactSource: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Register this source's artifacts in `set`.
    fn produce(&self, set: &ArtifactSet) -> Result<(), BuildError>;
}

/// Run every source into a fresh set.
pub fn build_all(sources: &[&dyn ArtifactSource]) -> Result<ArtifactSet, BuildError> {
    let set = ArtifactSet::new();
    sources.par_iter().try_for_each(|source| {
        let before = set.len();
        source.produce(&set)?;
        debug!(source = source.name(), total = set.len(), before, "source finished");
        Ok::<_, BuildError>(())
    })?;
    info!(artifacts = set.len(), "artifact set built");
    Ok(set)
}

/// Files under a directory, published at their relative paths.
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    /// Publish the contents of `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), BuildError> {
        let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;
        for entry in entries {
            let path = entry.map_err(|e| io_error(dir, e))?.path();
            if path.is_dir() {
                self.collect(&path, out)?;
            } else if path.is_file() {
                out.push(path);
            }
        }
        Ok(())
    }
}

impl ArtifactSource for StaticFiles {
    fn name(&self) -> &'static str {
        "static files"
    }

    fn produce(&self, set: &ArtifactSet) -> Result<(), BuildError> {
        let mut files = Vec::new();
        self.collect(&self.root, &mut files)?;

        for file in &files {
            let Ok(relative) = file.strip_prefix(&self.root) else {
                continue;
            };
            let logical: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let content_type = file
                .extension()
                .and_then(|e| e.to_str())
                .map(content_type_for_extension)
                .unwrap_or(metasync_types::APPLICATION_OCTET_STREAM);
            let bytes = fs::read(file).map_err(|e| io_error(file, e))?;
            set.insert(Artifact::new(logical.join("/"), bytes, content_type))?;
        }

        info!(count = files.len(), root = %self.root.display(), "added static files");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Io {
        path: path.display().to_string(),
        source,
    }
}
