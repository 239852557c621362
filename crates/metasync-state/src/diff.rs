//! Change detection between a run's artifacts and the previous manifest.
//!
//! The whole algorithm is two steps: classify every produced artifact by
//! comparing its content hash with the recorded one, then compute the stale
//! set once as `previous paths − seen paths`.

use std::collections::BTreeSet;

use metasync_types::{Artifact, ContentHash};
use tracing::debug;

use crate::manifest::Manifest;

/// Outcome of comparing one artifact with the previous manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Same hash as last run; skip the upload.
    Unchanged,
    /// Different hash, or a path the previous run did not publish.
    Changed,
}

/// Work derived from a diff: what to upload and what to delete.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Changed and new artifacts, in path order.
    pub to_upload: Vec<Artifact>,
    /// Stale paths, in path order.
    pub to_delete: Vec<String>,
}

impl ChangeSet {
    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_delete.is_empty()
    }

    /// Paths of the artifacts queued for upload.
    pub fn upload_paths(&self) -> Vec<String> {
        self.to_upload.iter().map(|a| a.path().to_string()).collect()
    }
}

/// Counters for a diff.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffStats {
    /// Artifacts whose hash matched the previous manifest.
    pub unchanged: usize,
    /// Artifacts whose hash differed.
    pub changed: usize,
    /// Artifacts with no previous entry.
    pub added: usize,
    /// Previously published paths not produced this run.
    pub stale: usize,
}

/// Everything the diff produces.
#[derive(Debug, Default)]
pub struct DiffOutcome {
    /// Uploads and deletions to apply.
    pub change_set: ChangeSet,
    /// Manifest describing this run's artifacts, to persist at the end.
    pub manifest: Manifest,
    /// Counters for logging.
    pub stats: DiffStats,
}

/// Compare `hash` with the hash recorded for `path` in `previous`.
pub fn classify(previous: &Manifest, path: &str, hash: &ContentHash) -> Classification {
    match previous.get(path) {
        Some(recorded) if recorded == hash => Classification::Unchanged,
        _ => Classification::Changed,
    }
}

/// Paths recorded in `previous` that are absent from `seen`.
pub fn stale_paths(previous: &Manifest, seen: &Manifest) -> BTreeSet<String> {
    previous
        .paths()
        .filter(|p| !seen.contains(p))
        .map(str::to_string)
        .collect()
}

/// Diff a run's artifacts against the previous manifest.
///
/// Every artifact lands in the new manifest, whether or not it is uploaded.
/// Artifact paths are expected to be unique; the builder enforces that.
pub fn diff(previous: &Manifest, artifacts: impl IntoIterator<Item = Artifact>) -> DiffOutcome {
    diff_inner(previous, artifacts, false)
}

/// Like [`diff`], but every artifact is classified [`Classification::Changed`].
///
/// Stale paths are still computed against `previous`, so paths dropped from
/// this run are deleted and leave the manifest as usual.
pub fn diff_forced(
    previous: &Manifest,
    artifacts: impl IntoIterator<Item = Artifact>,
) -> DiffOutcome {
    diff_inner(previous, artifacts, true)
}

fn diff_inner(
    previous: &Manifest,
    artifacts: impl IntoIterator<Item = Artifact>,
    force: bool,
) -> DiffOutcome {
    let mut outcome = DiffOutcome::default();

    for artifact in artifacts {
        let hash = artifact.content_hash();
        let classification = if force {
            Classification::Changed
        } else {
            classify(previous, artifact.path(), &hash)
        };
        outcome.manifest.insert(artifact.path(), hash);

        match classification {
            Classification::Unchanged => outcome.stats.unchanged += 1,
            Classification::Changed => {
                if previous.contains(artifact.path()) {
                    outcome.stats.changed += 1;
                } else {
                    outcome.stats.added += 1;
                }
                debug!(path = artifact.path(), "queued for upload");
                outcome.change_set.to_upload.push(artifact);
            }
        }
    }

    outcome
        .change_set
        .to_upload
        .sort_by(|a, b| a.path().cmp(b.path()));

    let stale = stale_paths(previous, &outcome.manifest);
    outcome.stats.stale = stale.len();
    outcome.change_set.to_delete = stale.into_iter().collect();

    outcome
}
