//! [`Publisher`]: one publish run, phase by phase.

use std::sync::Arc;

use metasync_builder::ArtifactProvider;
use metasync_purge::{CacheInvalidator, PurgeReport};
use metasync_state::{
    DEFAULT_MANIFEST_PATH, DiffOutcome, DiffStats, Manifest, ManifestStore, diff, diff_forced,
};
use metasync_store::ObjectStore;
use metasync_sync::{DEFAULT_UPLOAD_CONCURRENCY, SyncExecutor, SyncMode, SyncReport};
use tracing::{info, warn};

use crate::error::PublishError;

/// Knobs for a publish run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    /// Object path of the persisted manifest.
    pub manifest_path: String,
    /// Maximum in-flight uploads.
    pub upload_concurrency: usize,
    /// Live, or dry run (no deletes, no purge).
    pub mode: SyncMode,
    /// Upload every artifact, even unchanged ones. Stale paths are still
    /// found against the previous manifest and deleted.
    pub reupload_all: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            mode: SyncMode::Live,
            reupload_all: false,
        }
    }
}

/// The result of building and diffing, before anything is mutated.
#[derive(Debug)]
pub struct Plan {
    /// Entries in the manifest the diff ran against.
    pub previous_entries: usize,
    /// Change set, new manifest and counters.
    pub outcome: DiffOutcome,
}

impl Plan {
    /// Paths that would be uploaded, sorted.
    pub fn changed(&self) -> Vec<String> {
        self.outcome.change_set.upload_paths()
    }

    /// Paths that would be deleted, sorted.
    pub fn stale(&self) -> &[String] {
        &self.outcome.change_set.to_delete
    }
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    /// Uploaded paths, sorted.
    pub changed: Vec<String>,
    /// Stale paths, sorted. Only deleted in live mode.
    pub stale: Vec<String>,
    /// Diff counters.
    pub stats: DiffStats,
    /// Storage counters.
    pub sync: SyncReport,
    /// CDN counters, when a purge ran.
    pub purge: Option<PurgeReport>,
    /// Entries in the persisted manifest.
    pub manifest_entries: usize,
}

impl PublishSummary {
    /// The changed paths as a collapsible CI log group.
    pub fn changed_files_group(&self) -> String {
        let mut out = format!("::group::Changed file(s) ({})\n", self.changed.len());
        for path in &self.changed {
            out.push_str(path);
            out.push('\n');
        }
        out.push_str("::endgroup::");
        out
    }
}

/// Runs publishes against one store.
pub struct Publisher {
    provider: Arc<dyn ArtifactProvider>,
    manifest: ManifestStore,
    executor: SyncExecutor,
    invalidator: Option<CacheInvalidator>,
    reupload_all: bool,
}

impl Publisher {
    /// A publisher writing `provider`'s artifacts into `store`.
    ///
    /// No CDN purge happens until an invalidator is attached with
    /// [`with_invalidator`](Self::with_invalidator).
    pub fn new(
        provider: Arc<dyn ArtifactProvider>,
        store: Arc<dyn ObjectStore>,
        options: PublishOptions,
    ) -> Self {
        Self {
            provider,
            manifest: ManifestStore::new(store.clone(), options.manifest_path),
            executor: SyncExecutor::new(store, options.upload_concurrency, options.mode),
            invalidator: None,
            reupload_all: options.reupload_all,
        }
    }

    /// Purge changed URLs through `invalidator` after each live sync.
    pub fn with_invalidator(mut self, invalidator: CacheInvalidator) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    /// Sync mode this publisher runs in.
    pub fn mode(&self) -> SyncMode {
        self.executor.mode()
    }

    /// The previous manifest as persisted.
    pub async fn load_manifest(&self) -> Result<Manifest, PublishError> {
        Ok(self.manifest.load().await?)
    }

    /// Build and diff without touching storage or the CDN.
    pub async fn plan(&self) -> Result<Plan, PublishError> {
        let previous = self.manifest.load().await?;

        let set = self.provider.provide().await?;
        let artifacts = set.len();
        let outcome = if self.reupload_all {
            info!("reuploading everything, unchanged artifacts included");
            diff_forced(&previous, set.into_sorted_vec())
        } else {
            diff(&previous, set.into_sorted_vec())
        };
        info!(
            artifacts,
            unchanged = outcome.stats.unchanged,
            changed = outcome.stats.changed,
            added = outcome.stats.added,
            stale = outcome.stats.stale,
            "diff complete"
        );

        Ok(Plan {
            previous_entries: previous.len(),
            outcome,
        })
    }

    /// Run every phase. The manifest is saved only if all of them succeed.
    pub async fn publish(&mut self) -> Result<PublishSummary, PublishError> {
        let plan = self.plan().await?;
        let DiffOutcome {
            change_set,
            manifest,
            stats,
        } = plan.outcome;
        let changed = change_set.upload_paths();

        let sync = self.executor.apply(&change_set).await?;

        let purge = match (&mut self.invalidator, self.executor.mode()) {
            (Some(invalidator), SyncMode::Live) => Some(invalidator.invalidate(&changed).await?),
            (None, SyncMode::Live) => {
                warn!(paths = changed.len(), "no CDN configured, skipping purge");
                None
            }
            (_, SyncMode::DryRun) => {
                info!(paths = changed.len(), "dry run, skipping purge");
                None
            }
        };

        self.manifest.save(&manifest).await?;
        info!(
            uploaded = sync.uploaded,
            deleted = sync.deleted,
            manifest = manifest.len(),
            "publish complete"
        );

        Ok(PublishSummary {
            changed,
            stale: change_set.to_delete,
            stats,
            sync,
            purge,
            manifest_entries: manifest.len(),
        })
    }
}
