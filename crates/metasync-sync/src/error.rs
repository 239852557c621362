//! Error types for sync operations.

use metasync_store::StoreError;

use crate::executor::SyncReport;

/// Errors that can occur while applying a change set.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// At least one upload or delete failed after the store's own retries.
    #[error("{} sync operation(s) failed, first: {operation} {path}: {source}", .report.failed)]
    Failed {
        /// Counts at the point the sync stopped.
        report: SyncReport,
        /// Operation of the first failure (`upload` or `delete`).
        operation: &'static str,
        /// Path of the first failure.
        path: String,
        /// Store error of the first failure.
        source: StoreError,
    },

    /// The worker pool was closed before every operation was scheduled.
    #[error("sync worker pool closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    /// A worker task panicked or was cancelled.
    #[error("sync worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
