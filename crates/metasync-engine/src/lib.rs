//! Publish pipeline orchestration.
//!
//! The [`Publisher`] runs the phases of a publish in order, with a join
//! point between each: load the previous manifest, build the artifact set,
//! diff, apply the change set to storage, purge changed URLs from the CDN,
//! then persist the new manifest. The manifest is only written once every
//! earlier phase has succeeded.

pub mod error;
pub mod publisher;

pub use error::PublishError;
pub use publisher::{Plan, PublishOptions, PublishSummary, Publisher};
