//! Error types for artifact generation.

use metasync_upstream::UpstreamError;

/// Errors that can occur while building the artifact set.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An upstream source could not be read.
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Two different artifacts were produced for the same path in one run.
    #[error("conflicting artifacts produced for {path}")]
    PathCollision {
        /// The contested path.
        path: String,
    },

    /// A version string did not have the expected shape.
    #[error("invalid version {version:?}: {reason}")]
    InvalidVersion {
        /// The offending version.
        version: String,
        /// What was expected.
        reason: &'static str,
    },

    /// A cross-product entry referenced upstream data that was not fetched.
    #[error("missing {what} for {key}")]
    MissingUpstream {
        /// Kind of data (`hashed`, `intermediary`, `launcher metadata`).
        what: &'static str,
        /// The game or loader version it was needed for.
        key: String,
    },

    /// A document could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A static file could not be read.
    #[error("failed to read static file {path}: {source}")]
    Io {
        /// File path on disk.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The blocking build task panicked.
    #[error("build task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
