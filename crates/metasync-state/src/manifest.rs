//! The persisted path → content-hash manifest.
//!
//! Wire format: a gzip stream of `path:hash;path:hash;...`. The format has no
//! escaping. Entries whose path or hash contains a separator cannot be
//! represented; they are skipped on encode and reported when a malformed
//! entry is met on decode, in both cases with a warning rather than an error.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use metasync_types::ContentHash;
use tracing::warn;

use crate::error::StateError;

/// Separates a path from its hash.
pub const FIELD_SEPARATOR: char = ':';

/// Terminates each entry.
pub const ENTRY_SEPARATOR: char = ';';

/// Mapping of published path to the hash of its cache-relevant bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, ContentHash>,
}

impl Manifest {
    /// An empty manifest (the state before the first run).
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `hash` for `path`, returning the previous hash if any.
    pub fn insert(&mut self, path: impl Into<String>, hash: ContentHash) -> Option<ContentHash> {
        self.entries.insert(path.into(), hash)
    }

    /// Recorded hash for `path`.
    pub fn get(&self, path: &str) -> Option<&ContentHash> {
        self.entries.get(path)
    }

    /// Whether `path` has an entry.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentHash)> {
        self.entries.iter().map(|(p, h)| (p.as_str(), h))
    }

    /// Serialize and gzip the manifest.
    pub fn encode(&self) -> Result<Vec<u8>, StateError> {
        let mut text = String::new();
        for (path, hash) in &self.entries {
            if !is_representable(path) || !is_representable(hash.as_str()) {
                warn!(path, "manifest entry contains a separator, not persisting it");
                continue;
            }
            text.push_str(path);
            text.push(FIELD_SEPARATOR);
            text.push_str(hash.as_str());
            text.push(ENTRY_SEPARATOR);
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes())?;
        Ok(encoder.finish()?)
    }

    /// Gunzip and parse a manifest.
    ///
    /// Malformed entries are logged and dropped; loading continues. A
    /// zero-length blob is read as an empty manifest.
    pub fn decode(bytes: &[u8]) -> Result<Self, StateError> {
        if bytes.is_empty() {
            warn!("manifest blob is empty, treating it as no entries");
            return Ok(Manifest::new());
        }

        let mut raw = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut raw)?;
        let text = String::from_utf8(raw)?;

        let mut manifest = Manifest::new();
        for entry in text.split(ENTRY_SEPARATOR) {
            if entry.is_empty() {
                continue;
            }
            let fields: Vec<&str> = entry.split(FIELD_SEPARATOR).collect();
            match fields.as_slice() {
                [path, hash] if !path.is_empty() && !hash.is_empty() => {
                    manifest.insert(*path, ContentHash::from_encoded(*hash));
                }
                _ => warn!(entry, "invalid entry in manifest, dropping it"),
            }
        }
        Ok(manifest)
    }
}

fn is_representable(s: &str) -> bool {
    !s.contains(FIELD_SEPARATOR) && !s.contains(ENTRY_SEPARATOR)
}

impl FromIterator<(String, ContentHash)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, ContentHash)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
