//! Error types for cache invalidation.

/// Errors that can occur while purging CDN caches.
#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    /// The purge request could not be sent or its response could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The CDN answered a batch with a non-200 status.
    #[error("failed to purge batch {batch} (status code {status}): {body}")]
    Rejected {
        /// 1-based index of the failing batch.
        batch: usize,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The batch size and quota cannot be satisfied together.
    #[error("invalid purge limits: batch size {batch_size}, {limit_per_minute} urls per minute")]
    InvalidLimits {
        /// URLs per request.
        batch_size: usize,
        /// URLs per one-minute window.
        limit_per_minute: usize,
    },

    /// The endpoint could not be built from the zone id.
    #[error("invalid purge endpoint: {0}")]
    InvalidEndpoint(String),
}
