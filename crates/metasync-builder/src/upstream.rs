//! Fetching every upstream source behind a single join barrier.
//!
//! The listings are independent and fetched concurrently. Launcher metadata
//! depends only on the loader listing and is chained after it. Library
//! enrichment needs the game and loader lists and runs last. Nothing is
//! generated until [`UpstreamData::fetch`] has returned.

use std::collections::HashMap;
use std::sync::Arc;

use metasync_upstream::{
    ArtifactMetadata, DEFAULT_GAME_MANIFEST_URL, DEFAULT_USER_AGENT, Fetcher, GameManifest,
    GameVersion, LauncherMeta, Library, MavenArtifact, MavenRepository, enrich_all,
    fetch_launcher_meta,
};
use tracing::info;

use crate::error::BuildError;

/// Quilt maven repository.
pub const DEFAULT_MAVEN_URL: &str = "https://maven.quiltmc.org/repository/release/";
/// Fabric maven repository (intermediary mappings).
pub const DEFAULT_FABRIC_MAVEN_URL: &str = "https://maven.fabricmc.net/";

/// Where upstream data lives and how hard to hit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Maven group of the published artifacts.
    pub group: String,
    /// Main repository.
    pub maven_url: String,
    /// Repository hosting intermediary mappings.
    pub fabric_maven_url: String,
    /// Game-version manifest.
    pub game_manifest_url: String,
    /// Loader artifact id; also the profile id prefix.
    pub loader_artifact: String,
    /// Installer artifact id.
    pub installer_artifact: String,
    /// Mappings artifact id.
    pub mappings_artifact: String,
    /// Hashed mappings artifact id.
    pub hashed_artifact: String,
    /// Intermediary group id.
    pub intermediary_group: String,
    /// Intermediary artifact id.
    pub intermediary_artifact: String,
    /// Concurrent per-artifact requests (launcher metadata, enrichment).
    pub fetch_concurrency: usize,
    /// Whether to look up checksums for profile libraries.
    pub enrich_libraries: bool,
    /// User agent for upstream requests.
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            group: "org.quiltmc".into(),
            maven_url: DEFAULT_MAVEN_URL.into(),
            fabric_maven_url: DEFAULT_FABRIC_MAVEN_URL.into(),
            game_manifest_url: DEFAULT_GAME_MANIFEST_URL.into(),
            loader_artifact: "quilt-loader".into(),
            installer_artifact: "quilt-installer".into(),
            mappings_artifact: "quilt-mappings".into(),
            hashed_artifact: "hashed".into(),
            intermediary_group: "net.fabricmc".into(),
            intermediary_artifact: "intermediary".into(),
            fetch_concurrency: 16,
            enrich_libraries: true,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

/// Everything the documents are generated from, fully materialized.
#[derive(Debug, Clone)]
pub struct UpstreamData {
    /// Main repository root.
    pub maven_url: String,
    /// Intermediary repository root.
    pub fabric_maven_url: String,
    /// Loader artifact id.
    pub loader_artifact: String,
    /// Publishable game versions, manifest order.
    pub game: Vec<GameVersion>,
    /// Mappings versions, newest first.
    pub mappings: ArtifactMetadata,
    /// Hashed mappings versions, newest first.
    pub hashed: ArtifactMetadata,
    /// Intermediary versions, newest first.
    pub intermediary: ArtifactMetadata,
    /// Installer versions, newest first.
    pub installer: ArtifactMetadata,
    /// Loader versions, newest first.
    pub loader: ArtifactMetadata,
    /// Launcher metadata keyed by loader maven id.
    pub launcher_meta: HashMap<String, LauncherMeta>,
    /// Enriched libraries keyed by maven id; empty when enrichment is off.
    pub libraries: HashMap<String, Library>,
}

impl UpstreamData {
    /// Fetch every source. Any failure aborts the fetch.
    pub async fn fetch(
        fetcher: Arc<dyn Fetcher>,
        config: &UpstreamConfig,
    ) -> Result<Self, BuildError> {
        let quilt = MavenRepository::new(&config.maven_url, fetcher.clone());
        let fabric = MavenRepository::new(&config.fabric_maven_url, fetcher.clone());

        let loader_with_meta = async {
            let loader = quilt
                .metadata(&config.group, &config.loader_artifact)
                .await?;
            info!(count = loader.len(), "found loaders");
            let meta =
                fetch_launcher_meta(fetcher.clone(), &loader.versions, config.fetch_concurrency)
                    .await?;
            Ok::<_, metasync_upstream::UpstreamError>((loader, meta))
        };

        let (mappings, hashed, intermediary, installer, (loader, launcher_meta), manifest) =
            tokio::try_join!(
                quilt.metadata(&config.group, &config.mappings_artifact),
                quilt.metadata(&config.group, &config.hashed_artifact),
                fabric.metadata(&config.intermediary_group, &config.intermediary_artifact),
                quilt.metadata(&config.group, &config.installer_artifact),
                loader_with_meta,
                GameManifest::fetch(fetcher.as_ref(), &config.game_manifest_url),
            )?;

        let game = manifest.published(&hashed);
        info!(
            game = game.len(),
            mappings = mappings.len(),
            hashed = hashed.len(),
            intermediary = intermediary.len(),
            installer = installer.len(),
            "gathered upstream data"
        );

        let mut data = Self {
            maven_url: quilt.url().to_string(),
            fabric_maven_url: fabric.url().to_string(),
            loader_artifact: config.loader_artifact.clone(),
            game,
            mappings,
            hashed,
            intermediary,
            installer,
            loader,
            launcher_meta,
            libraries: HashMap::new(),
        };

        if config.enrich_libraries {
            let libraries = data.profile_libraries();
            data.libraries = enrich_all(fetcher, libraries, config.fetch_concurrency).await?;
        }

        Ok(data)
    }

    /// First listed hashed artifact for a game version.
    pub fn hashed_for(&self, game: &str) -> Option<&MavenArtifact> {
        self.hashed.iter().find(|a| a.version == game)
    }

    /// First listed intermediary artifact for a game version.
    pub fn intermediary_for(&self, game: &str) -> Option<&MavenArtifact> {
        self.intermediary.iter().find(|a| a.version == game)
    }

    /// A library entry for `maven_id`, enriched if data is available.
    pub fn library(&self, maven_id: &str, repository: &str) -> Library {
        self.libraries
            .get(maven_id)
            .cloned()
            .unwrap_or_else(|| Library::new(maven_id, repository))
    }

    /// The per-version libraries profiles add on top of launcher metadata.
    fn profile_libraries(&self) -> Vec<Library> {
        let mut libraries = Vec::new();
        for game in &self.game {
            if let Some(hashed) = self.hashed_for(&game.version) {
                libraries.push(Library::new(hashed.maven_id(), &self.maven_url));
            }
            if let Some(intermediary) = self.intermediary_for(&game.version) {
                libraries.push(Library::new(intermediary.maven_id(), &self.fabric_maven_url));
            }
        }
        for loader in self.loader.iter() {
            libraries.push(Library::new(loader.maven_id(), &self.maven_url));
        }
        libraries
    }
}
