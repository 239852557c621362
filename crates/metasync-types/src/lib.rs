//! Shared types for metasync.
//!
//! This crate defines the values that flow between every stage of a publish
//! run: the [`Artifact`] produced by the builder, the [`ContentHash`] used for
//! change detection, and the content-type constants attached to uploads.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// Content type of every generated metadata document.
pub const APPLICATION_JSON: &str = "application/json";

/// Content type of the persisted manifest blob.
pub const APPLICATION_GZIP: &str = "application/gzip";

/// Fallback content type for static files with an unknown extension.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// Guess a content type from a file extension (without the leading dot).
pub fn content_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "json" => APPLICATION_JSON,
        "html" | "htm" => "text/html",
        "yaml" | "yml" => "text/yaml",
        "css" => "text/css",
        "js" => "text/javascript",
        "ico" => "image/x-icon",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        _ => APPLICATION_OCTET_STREAM,
    }
}

// ---------------------------------------------------------------------------
// Content hash
// ---------------------------------------------------------------------------

/// Content hash of an artifact's cache-relevant bytes.
///
/// Computed as `blake3(bytes)` and stored in its URL-safe base64 form, which
/// is also the representation written to the manifest. Hashes loaded from a
/// manifest are kept verbatim, so entries written by an older digest simply
/// compare unequal and get republished once.
#[derive(Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash arbitrary bytes with BLAKE3.
    pub fn of(data: &[u8]) -> Self {
        Self(URL_SAFE.encode(blake3::hash(data).as_bytes()))
    }

    /// Wrap an already-encoded hash (e.g. one read back from a manifest).
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// One published document: a logical path, its bytes, and a content type.
///
/// An artifact may carry a cache snapshot: an alternate payload that omits
/// fields which change on every run (generation timestamps). When present, the
/// snapshot is what gets hashed for change detection, while `bytes` is still
/// what gets uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: String,
    bytes: Bytes,
    content_type: &'static str,
    snapshot: Option<Bytes>,
}

impl Artifact {
    /// Create an artifact whose published bytes are also its cache-relevant bytes.
    pub fn new(
        path: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: &'static str,
    ) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
            content_type,
            snapshot: None,
        }
    }

    /// Shorthand for an `application/json` artifact.
    pub fn json(path: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self::new(path, bytes, APPLICATION_JSON)
    }

    /// Attach a cache snapshot used for hashing instead of the published bytes.
    pub fn with_snapshot(mut self, snapshot: impl Into<Bytes>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }

    /// Slash-delimited, case-sensitive logical path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The bytes that get uploaded.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Content type sent with the upload.
    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// The cache snapshot, if one was attached.
    pub fn snapshot(&self) -> Option<&Bytes> {
        self.snapshot.as_ref()
    }

    /// The bytes that participate in change detection.
    pub fn cache_relevant(&self) -> &[u8] {
        self.snapshot.as_deref().unwrap_or(&self.bytes)
    }

    /// Hash of [`cache_relevant`](Self::cache_relevant).
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of(self.cache_relevant())
    }
}
