//! CDN cache invalidation for metasync.
//!
//! This crate provides:
//!
//! - [`FixedWindowLimiter`]: per-minute quota with bursts allowed at the start
//!   of each window.
//! - [`Clock`]: the time source the limiter waits on, with [`TokioClock`] for
//!   real runs and [`ManualClock`] for tests.
//! - [`Purger`]: the bulk-invalidation collaborator, implemented over HTTP by
//!   [`CloudflarePurger`].
//! - [`CacheInvalidator`]: turns changed paths into public URLs and submits
//!   them in fixed-size batches under the limiter.

pub mod clock;
pub mod error;
pub mod invalidator;
pub mod limiter;
pub mod purger;

pub use clock::{Clock, ManualClock, TokioClock};
pub use error::PurgeError;
pub use invalidator::{
    CacheInvalidator, DEFAULT_BATCH_SIZE, DEFAULT_LIMIT_PER_MINUTE, PurgeLimits, PurgeReport,
};
pub use limiter::FixedWindowLimiter;
pub use purger::{CLOUDFLARE_API_URL, CloudflarePurger, PurgeResponse, Purger, RecordingPurger};
