//! The game-version manifest.

use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::fetch::{Fetcher, fetch_json};
use crate::maven::ArtifactMetadata;

/// Public game-version manifest.
pub const DEFAULT_GAME_MANIFEST_URL: &str =
    "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// The subset of the version manifest that matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct GameManifest {
    /// Every game version, in manifest order (newest first).
    pub versions: Vec<GameManifestEntry>,
}

/// One version in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct GameManifestEntry {
    /// Version id.
    pub id: String,
    /// Release channel (`release`, `snapshot`, `old_beta`, ...).
    #[serde(rename = "type")]
    pub kind: String,
}

/// A publishable game version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameVersion {
    /// Version id.
    pub version: String,
    /// Whether this is a release rather than a snapshot.
    pub stable: bool,
}

impl GameManifest {
    /// Fetch and parse the manifest at `url`.
    pub async fn fetch(fetcher: &dyn Fetcher, url: &str) -> Result<Self, UpstreamError> {
        fetch_json(fetcher, url).await
    }

    /// Versions that have a matching `mappings` artifact, in manifest order.
    pub fn published(&self, mappings: &ArtifactMetadata) -> Vec<GameVersion> {
        self.versions
            .iter()
            .filter(|v| mappings.contains(&v.id))
            .map(|v| GameVersion {
                version: v.id.clone(),
                stable: v.kind == "release",
            })
            .collect()
    }
}
