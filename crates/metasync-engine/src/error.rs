//! Error types for a publish run.

/// Any error that aborts a publish run.
///
/// A run is all-or-nothing: every variant leaves the persisted manifest as
/// it was before the run.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Upstream data could not be fetched or the artifact set is invalid.
    #[error("build error: {0}")]
    Build(#[from] metasync_builder::BuildError),

    /// The manifest could not be loaded or saved.
    #[error("state error: {0}")]
    State(#[from] metasync_state::StateError),

    /// An upload or delete failed.
    #[error("sync error: {0}")]
    Sync(#[from] metasync_sync::SyncError),

    /// The CDN rejected a purge batch.
    #[error("purge error: {0}")]
    Purge(#[from] metasync_purge::PurgeError),
}
