//! Persisted publish state and change detection.
//!
//! This crate provides:
//! - [`Manifest`] — the path → content-hash map, with its gzip `path:hash;` codec.
//! - [`ManifestStore`] — loads the previous run's manifest and persists the new one.
//! - [`diff`] — classifies a run's artifacts against the previous manifest and
//!   derives the [`ChangeSet`] (uploads and stale deletions).

mod diff;
mod error;
mod manifest;
mod store;

pub use diff::{
    ChangeSet, Classification, DiffOutcome, DiffStats, classify, diff, diff_forced, stale_paths,
};
pub use error::StateError;
pub use manifest::{ENTRY_SEPARATOR, FIELD_SEPARATOR, Manifest};
pub use store::{DEFAULT_MANIFEST_PATH, ManifestStore};
