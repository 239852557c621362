//! Object storage trait and backend implementations.
//!
//! This crate defines the [`ObjectStore`] trait the publish pipeline writes
//! through, along with the concrete backends:
//!
//! - [`B2Store`] — Backblaze B2 native API, used against live infrastructure.
//! - [`FileStore`] — local dump directory, used for dry runs.
//! - [`MemoryStore`] — in-memory map, used in tests.
//! - [`FaultyStore`] — wrapper injecting latency and failures for tests.

mod b2_store;
mod error;
mod faulty_store;
mod file_store;
mod memory_store;
mod traits;

pub use b2_store::{B2_AUTHORIZE_URL, B2Credentials, B2Store};
pub use error::StoreError;
pub use faulty_store::FaultyStore;
pub use file_store::FileStore;
pub use memory_store::{MemoryStore, StoredObject};
pub use traits::ObjectStore;
