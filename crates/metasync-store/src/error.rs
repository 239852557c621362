//! Error types for object storage operations.

/// Errors that can occur during object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request to the storage service failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The storage service answered with a non-success status.
    #[error("{operation} {path} failed with status {status}: {message}")]
    Backend {
        /// The operation that failed (`upload`, `delete`, ...).
        operation: &'static str,
        /// The object path, or the API call for account-level requests.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The configured bucket does not exist or is not visible to the key.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// The object path cannot be mapped onto this backend.
    #[error("invalid object path: {0:?}")]
    InvalidPath(String),

    /// A failure injected by [`FaultyStore`](crate::FaultyStore).
    #[error("injected failure for {0}")]
    Injected(String),
}

impl StoreError {
    /// Whether a retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            StoreError::Backend { status, .. } => {
                *status == 401 || *status == 408 || *status == 429 || *status >= 500
            }
            _ => false,
        }
    }
}
