//! Sync executor: pushes changed artifacts and removes stale paths.
//!
//! Uploads are independent; each runs on its own task and holds one permit
//! of the pool semaphore for its duration. A failed upload does not cancel
//! the others. Deletes start only after the whole upload batch has completed,
//! and only in [`SyncMode::Live`].

use std::sync::Arc;

use metasync_state::ChangeSet;
use metasync_store::{ObjectStore, StoreError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::SyncError;

/// Default number of concurrent in-flight uploads.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 50;

/// Whether remote mutations other than uploads are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Upload changes and delete stale paths.
    #[default]
    Live,
    /// Upload changes to the configured (local) store; never delete.
    DryRun,
}

/// Counts for one `apply` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Artifacts uploaded successfully.
    pub uploaded: usize,
    /// Stale paths deleted successfully.
    pub deleted: usize,
    /// Operations that failed.
    pub failed: usize,
    /// Stale paths left in place because of [`SyncMode::DryRun`].
    pub skipped_deletes: usize,
}

struct Failure {
    operation: &'static str,
    path: String,
    error: StoreError,
}

/// Applies change sets against an [`ObjectStore`] with bounded parallelism.
pub struct SyncExecutor {
    store: Arc<dyn ObjectStore>,
    /// Semaphore limiting concurrent store operations.
    concurrency: Arc<Semaphore>,
    mode: SyncMode,
}

impl SyncExecutor {
    /// Create an executor allowing `max_concurrent` in-flight operations.
    pub fn new(store: Arc<dyn ObjectStore>, max_concurrent: usize, mode: SyncMode) -> Self {
        Self {
            store,
            concurrency: Arc::new(Semaphore::new(max_concurrent.max(1))),
            mode,
        }
    }

    /// The configured mode.
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Upload every artifact in `change_set`, then delete its stale paths.
    ///
    /// Returns an error if any operation failed; in-flight operations are
    /// allowed to finish first. Deletes are not attempted after a failed
    /// upload batch.
    pub async fn apply(&self, change_set: &ChangeSet) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        info!(
            uploads = change_set.to_upload.len(),
            stale = change_set.to_delete.len(),
            "syncing files"
        );

        let mut failures = self.upload_all(change_set, &mut report).await?;

        if failures.is_empty() {
            match self.mode {
                SyncMode::Live => {
                    failures = self.delete_all(&change_set.to_delete, &mut report).await?;
                }
                SyncMode::DryRun => {
                    report.skipped_deletes = change_set.to_delete.len();
                    if report.skipped_deletes > 0 {
                        info!(
                            skipped = report.skipped_deletes,
                            "dry run, leaving stale files in place"
                        );
                    }
                }
            }
        }

        report.failed = failures.len();
        if let Some(first) = failures.into_iter().next() {
            error!(failed = report.failed, "sync failed");
            return Err(SyncError::Failed {
                report,
                operation: first.operation,
                path: first.path,
                source: first.error,
            });
        }

        info!(
            uploaded = report.uploaded,
            deleted = report.deleted,
            "sync complete"
        );
        Ok(report)
    }

    async fn upload_all(
        &self,
        change_set: &ChangeSet,
        report: &mut SyncReport,
    ) -> Result<Vec<Failure>, SyncError> {
        let mut tasks = JoinSet::new();

        for artifact in &change_set.to_upload {
            let permit = self
                .concurrency
                .clone()
                .acquire_owned()
                .await?;
            let store = self.store.clone();
            let artifact = artifact.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = store
                    .put(
                        artifact.path(),
                        artifact.bytes().clone(),
                        artifact.content_type(),
                    )
                    .await;
                (artifact.path().to_string(), result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (path, result) = joined?;
            match result {
                Ok(()) => {
                    debug!(%path, "uploaded");
                    report.uploaded += 1;
                }
                Err(e) => {
                    error!(%path, error = %e, "failed to upload");
                    failures.push(Failure {
                        operation: "upload",
                        path,
                        error: e,
                    });
                }
            }
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(failures)
    }

    async fn delete_all(
        &self,
        paths: &[String],
        report: &mut SyncReport,
    ) -> Result<Vec<Failure>, SyncError> {
        if !paths.is_empty() {
            info!(count = paths.len(), "deleting stale files");
        }

        let mut tasks = JoinSet::new();
        for path in paths {
            let permit = self
                .concurrency
                .clone()
                .acquire_owned()
                .await?;
            let store = self.store.clone();
            let path = path.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = store.delete(&path).await;
                (path, result)
            });
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (path, result) = joined?;
            match result {
                Ok(()) => {
                    debug!(%path, "deleted");
                    report.deleted += 1;
                }
                Err(e) => {
                    error!(%path, error = %e, "failed to delete");
                    failures.push(Failure {
                        operation: "delete",
                        path,
                        error: e,
                    });
                }
            }
        }
        failures.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(failures)
    }
}
