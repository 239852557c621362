//! Error types for upstream fetches.

/// Errors that can occur while reading upstream sources.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The request could not be completed.
    #[error("request to {url} failed: {source}")]
    Http {
        /// Requested URL.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an unexpected status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// A required document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A Maven metadata document could not be parsed.
    #[error("invalid maven metadata at {url}: {source}")]
    Xml {
        /// Requested URL.
        url: String,
        /// Parser error.
        #[source]
        source: quick_xml::DeError,
    },

    /// A JSON document could not be parsed.
    #[error("invalid json at {url}: {source}")]
    Json {
        /// Requested URL.
        url: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// A Maven coordinate did not have the `group:artifact:version` shape.
    #[error("invalid maven coordinate: {0:?}")]
    InvalidCoordinate(String),

    /// The fetch pool was closed before every request was scheduled.
    #[error("fetch pool closed")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    /// A fetch task panicked or was cancelled.
    #[error("fetch task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
