//! The run's concurrent path → artifact map.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metasync_types::Artifact;
use tracing::{debug, error};

use crate::error::BuildError;

/// Every artifact produced in one run, keyed by path.
///
/// Safe to fill from many threads at once. Each path is registered exactly
/// once; registering an identical artifact again is a no-op, registering a
/// different artifact for a taken path is a [`BuildError::PathCollision`].
#[derive(Default)]
pub struct ArtifactSet {
    artifacts: DashMap<String, Artifact>,
}

impl ArtifactSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `artifact` under its path.
    pub fn insert(&self, artifact: Artifact) -> Result<(), BuildError> {
        match self.artifacts.entry(artifact.path().to_string()) {
            Entry::Occupied(entry) => {
                if *entry.get() == artifact {
                    debug!(path = artifact.path(), "duplicate registration ignored");
                    Ok(())
                } else {
                    error!(path = artifact.path(), "conflicting artifact for path");
                    Err(BuildError::PathCollision {
                        path: artifact.path().to_string(),
                    })
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(artifact);
                Ok(())
            }
        }
    }

    /// Register a JSON document, pretty-printed.
    pub fn insert_json<T: serde::Serialize + ?Sized>(
        &self,
        path: impl Into<String>,
        value: &T,
    ) -> Result<(), BuildError> {
        self.insert(Artifact::json(path, serde_json::to_vec_pretty(value)?))
    }

    /// Whether `path` has been registered.
    pub fn contains(&self, path: &str) -> bool {
        self.artifacts.contains_key(path)
    }

    /// A copy of the artifact at `path`.
    pub fn get(&self, path: &str) -> Option<Artifact> {
        self.artifacts.get(path).map(|a| a.value().clone())
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Registered paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.artifacts.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Consume the set, returning artifacts sorted by path.
    pub fn into_sorted_vec(self) -> Vec<Artifact> {
        let mut artifacts: Vec<Artifact> = self.artifacts.into_iter().map(|(_, a)| a).collect();
        artifacts.sort_by(|a, b| a.path().cmp(b.path()));
        artifacts
    }
}

impl FromIterator<Artifact> for ArtifactSet {
    /// Collect artifacts, keeping the last one for a repeated path.
    fn from_iter<I: IntoIterator<Item = Artifact>>(iter: I) -> Self {
        let set = Self::new();
        for artifact in iter {
            set.artifacts.insert(artifact.path().to_string(), artifact);
        }
        set
    }
}
