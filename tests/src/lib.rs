//! Shared harness for metasync integration tests.
//!
//! Provides:
//! - [`Upstream`]: a small loader ecosystem served from memory, editable
//!   between runs (add a loader release, drop a game version).
//! - [`Deployment`]: the published side that survives across runs: an
//!   in-memory bucket, a recording CDN and a manual clock.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use metasync_builder::{ArtifactProvider, BuildContext, MetaBuilder, UpstreamConfig};
use metasync_engine::{PublishOptions, Publisher};
use metasync_purge::{CacheInvalidator, ManualClock, PurgeLimits, RecordingPurger};
use metasync_state::{DEFAULT_MANIFEST_PATH, Manifest, ManifestStore};
use metasync_store::{MemoryStore, ObjectStore};
use metasync_upstream::MemoryFetcher;
use serde_json::{Value, json};

/// Main maven repository.
pub const MAVEN: &str = "https://maven.test/release/";
/// Intermediary repository.
pub const FABRIC: &str = "https://fabric.test/";
/// Game version manifest.
pub const GAME_MANIFEST: &str = "https://launcher.test/version_manifest_v2.json";
/// Public URL of the bucket.
pub const BASE_URL: &str = "https://meta.test/";

// =========================================================================
// Upstream
// =========================================================================

/// Upstream state for one run.
#[derive(Debug, Clone)]
pub struct Upstream {
    /// Published game versions, newest first.
    pub games: Vec<String>,
    /// Loader releases, oldest first as listed in maven metadata.
    pub loaders: Vec<String>,
    /// Installer releases, oldest first.
    pub installers: Vec<String>,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            games: vec!["1.19".into(), "1.18.2".into()],
            loaders: vec!["0.16.0".into(), "0.17.0".into()],
            installers: vec!["0.4.0".into()],
        }
    }
}

fn metadata_xml(group: &str, artifact: &str, versions: &[String]) -> String {
    let versions: String = versions
        .iter()
        .map(|v| format!("<version>{v}</version>"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<metadata><groupId>{group}</groupId>\
         <artifactId>{artifact}</artifactId><versioning><versions>{versions}</versions>\
         </versioning></metadata>"
    )
}

impl Upstream {
    /// Launcher metadata served for `loader`.
    pub fn launcher_meta(loader: &str) -> Value {
        json!({
            "version": 1,
            "libraries": {
                "client": [],
                "common": [{"name": format!("org.quiltmc:common-dep:{loader}"), "url": MAVEN}],
                "server": []
            },
            "mainClass": {
                "client": "org.quiltmc.loader.impl.launch.knot.KnotClient",
                "server": "org.quiltmc.loader.impl.launch.knot.KnotServer",
                "serverLauncher": "org.quiltmc.loader.impl.launch.server.QuiltServerLauncher"
            }
        })
    }

    /// A fetcher serving this upstream.
    pub fn fetcher(&self) -> Arc<MemoryFetcher> {
        let oldest_first: Vec<String> = self.games.iter().rev().cloned().collect();
        let mappings: Vec<String> = oldest_first
            .iter()
            .map(|g| format!("{g}+build.1"))
            .collect();

        let fetcher = MemoryFetcher::new()
            .with(
                format!("{MAVEN}org/quiltmc/quilt-mappings/maven-metadata.xml"),
                metadata_xml("org.quiltmc", "quilt-mappings", &mappings),
            )
            .with(
                format!("{MAVEN}org/quiltmc/hashed/maven-metadata.xml"),
                metadata_xml("org.quiltmc", "hashed", &oldest_first),
            )
            .with(
                format!("{FABRIC}net/fabricmc/intermediary/maven-metadata.xml"),
                metadata_xml("net.fabricmc", "intermediary", &oldest_first),
            )
            .with(
                format!("{MAVEN}org/quiltmc/quilt-installer/maven-metadata.xml"),
                metadata_xml("org.quiltmc", "quilt-installer", &self.installers),
            )
            .with(
                format!("{MAVEN}org/quiltmc/quilt-loader/maven-metadata.xml"),
                metadata_xml("org.quiltmc", "quilt-loader", &self.loaders),
            );

        let versions: Vec<Value> = self
            .games
            .iter()
            .map(|g| json!({"id": g, "type": "release"}))
            .collect();
        fetcher.insert(GAME_MANIFEST, json!({ "versions": versions }).to_string());

        for loader in &self.loaders {
            fetcher.insert(
                format!("{MAVEN}org/quiltmc/quilt-loader/{loader}/quilt-loader-{loader}.json"),
                Self::launcher_meta(loader).to_string(),
            );
        }
        Arc::new(fetcher)
    }

    /// Builder settings pointing at this upstream. Enrichment is off.
    pub fn config(&self) -> UpstreamConfig {
        UpstreamConfig {
            maven_url: MAVEN.into(),
            fabric_maven_url: FABRIC.into(),
            game_manifest_url: GAME_MANIFEST.into(),
            fetch_concurrency: 4,
            enrich_libraries: false,
            ..UpstreamConfig::default()
        }
    }

    /// A builder for run number `run`; each run is stamped a minute later.
    pub fn builder(&self, run: u32) -> Arc<MetaBuilder> {
        let at = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, run % 60, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Arc::new(
            MetaBuilder::new(self.fetcher(), self.config()).with_context(BuildContext::at(at)),
        )
    }
}

// =========================================================================
// Deployment
// =========================================================================

/// The published side, shared across runs.
pub struct Deployment {
    /// The bucket.
    pub store: Arc<MemoryStore>,
    /// The CDN.
    pub purger: Arc<RecordingPurger>,
    /// Time as seen by the purge limiter.
    pub clock: Arc<ManualClock>,
}

impl Default for Deployment {
    fn default() -> Self {
        Self::new()
    }
}

impl Deployment {
    /// An empty bucket and a CDN that accepts everything.
    pub fn new() -> Self {
        Self::with_purger(RecordingPurger::new())
    }

    /// An empty bucket and the given CDN.
    pub fn with_purger(purger: RecordingPurger) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            purger: Arc::new(purger),
            clock: Arc::new(ManualClock::new()),
        }
    }

    /// A live publisher writing into the bucket.
    pub fn publisher(
        &self,
        provider: Arc<dyn ArtifactProvider>,
        options: PublishOptions,
    ) -> Publisher {
        self.publisher_on(self.store.clone(), provider, options)
    }

    /// A publisher writing through `store`, which usually wraps the bucket.
    pub fn publisher_on(
        &self,
        store: Arc<dyn ObjectStore>,
        provider: Arc<dyn ArtifactProvider>,
        options: PublishOptions,
    ) -> Publisher {
        let limits = PurgeLimits::default();
        let invalidator = CacheInvalidator::new(self.purger.clone(), BASE_URL, limits)
            .expect("default limits are valid")
            .with_clock(self.clock.clone());
        Publisher::new(provider, store, options).with_invalidator(invalidator)
    }

    /// The persisted manifest.
    pub async fn manifest(&self) -> Manifest {
        ManifestStore::new(self.store.clone(), DEFAULT_MANIFEST_PATH)
            .load()
            .await
            .expect("manifest loads")
    }

    /// A published JSON document.
    pub fn json(&self, path: &str) -> Value {
        let object = self
            .store
            .object(path)
            .unwrap_or_else(|| panic!("{path} is not published"));
        serde_json::from_slice(&object.data).expect("published document is JSON")
    }

    /// Published paths, excluding the manifest.
    pub fn documents(&self) -> Vec<String> {
        self.store
            .paths()
            .into_iter()
            .filter(|p| p != DEFAULT_MANIFEST_PATH)
            .collect()
    }
}
