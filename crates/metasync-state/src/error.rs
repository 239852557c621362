//! Error types for manifest persistence.

/// Errors that can occur while loading or saving the manifest.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// Reading or writing the manifest object failed.
    #[error("store error: {0}")]
    Store(#[from] metasync_store::StoreError),

    /// Gzip compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    /// The decompressed manifest is not valid UTF-8.
    #[error("manifest is not valid utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}
