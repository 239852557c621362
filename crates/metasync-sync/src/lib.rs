//! Applies a [`ChangeSet`](metasync_state::ChangeSet) to object storage.
//!
//! [`SyncExecutor`] uploads changed artifacts through a bounded worker pool,
//! then deletes stale paths once every upload has finished. Any failed
//! operation fails the whole sync after in-flight work has drained.

pub mod error;
pub mod executor;

pub use error::SyncError;
pub use executor::{DEFAULT_UPLOAD_CONCURRENCY, SyncExecutor, SyncMode, SyncReport};
