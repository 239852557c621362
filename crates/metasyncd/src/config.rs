//! TOML configuration for the publisher.
//!
//! Every section is optional; a missing file section takes its defaults.
//! Secrets are usually left out of the file and supplied through the
//! environment (see `main.rs`).

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use metasync_builder::{DEFAULT_FABRIC_MAVEN_URL, DEFAULT_MAVEN_URL, UpstreamConfig};
use metasync_purge::{DEFAULT_BATCH_SIZE, DEFAULT_LIMIT_PER_MINUTE, PurgeLimits};
use metasync_state::DEFAULT_MANIFEST_PATH;
use metasync_sync::DEFAULT_UPLOAD_CONCURRENCY;
use metasync_upstream::{DEFAULT_GAME_MANIFEST_URL, DEFAULT_USER_AGENT};
use serde::Deserialize;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Publish target and run mode.
    pub publish: PublishSection,
    /// Upstream repositories.
    pub upstream: UpstreamSection,
    /// Object storage backend.
    pub storage: StorageSection,
    /// CDN purging.
    pub cdn: CdnSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[publish]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PublishSection {
    /// Public URL the bucket is served under.
    pub base_url: String,
    /// Object path of the persisted manifest.
    pub manifest_path: String,
    /// Maximum in-flight uploads.
    pub upload_concurrency: usize,
    /// Write into the dump directory, delete nothing and purge nothing.
    pub dry_run: bool,
    /// Upload every document, unchanged ones included.
    pub reupload_all: bool,
    /// Directory of static files published next to the generated documents.
    pub static_dir: Option<PathBuf>,
}

impl Default for PublishSection {
    fn default() -> Self {
        Self {
            base_url: "https://meta.quiltmc.org/".to_string(),
            manifest_path: DEFAULT_MANIFEST_PATH.to_string(),
            upload_concurrency: DEFAULT_UPLOAD_CONCURRENCY,
            dry_run: false,
            reupload_all: false,
            static_dir: None,
        }
    }
}

/// `[upstream]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    /// Maven group of the published artifacts.
    pub group: String,
    /// Main maven repository.
    pub maven_url: String,
    /// Maven repository hosting intermediary mappings.
    pub fabric_maven_url: String,
    /// Game version manifest.
    pub game_manifest_url: String,
    /// Loader artifact id.
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
    /// Concurrent per-artifact upstream requests.
    pub fetch_concurrency: usize,
    /// Look up library checksums for profiles.
    pub enrich_libraries: bool,
    /// User agent for every outgoing request.
    pub user_agent: String,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        let defaults = UpstreamConfig::default();
        Self {
            group: defaults.group,
            maven_url: DEFAULT_MAVEN_URL.to_string(),
            fabric_maven_url: DEFAULT_FABRIC_MAVEN_URL.to_string(),
            game_manifest_url: DEFAULT_GAME_MANIFEST_URL.to_string(),
            loader_artifact: defaults.loader_artifact,
            installer_artifact: defaults.installer_artifact,
            mappings_artifact: defaults.mappings_artifact,
            hashed_artifact: defaults.hashed_artifact,
            intermediary_group: defaults.intermediary_group,
            intermediary_artifact: defaults.intermediary_artifact,
            fetch_concurrency: defaults.fetch_concurrency,
            enrich_libraries: defaults.enrich_libraries,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Storage backend kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Backblaze B2.
    #[default]
    B2,
    /// Local dump directory.
    File,
    /// In-process map, gone when the process exits.
    Memory,
}

/// `[storage]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend type.
    pub backend: Backend,
    /// B2 bucket name.
    pub bucket: String,
    /// Directory for the `file` backend.
    pub dump_dir: PathBuf,
    /// B2 application key id.
    pub key_id: Option<String>,
    /// B2 application key.
    pub application_key: Option<String>,
}

impl Default for StorageSection {
    fn default() -> Self {
        let dump_dir = dirs::cache_dir()
            .map(|c| c.join("metasync").join("dump"))
            .unwrap_or_else(|| PathBuf::from("dump"));
        Self {
            backend: Backend::B2,
            bucket: "quilt-meta".to_string(),
            dump_dir,
            key_id: None,
            application_key: None,
        }
    }
}

/// `[cdn]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CdnSection {
    /// Cloudflare zone id.
    pub zone_id: String,
    /// Cloudflare API token.
    pub api_token: Option<String>,
    /// Full purge URL, replacing the one derived from `zone_id`.
    pub purge_endpoint: Option<String>,
    /// URLs per purge request.
    pub batch_size: usize,
    /// URLs purged per minute.
    pub limit_per_minute: usize,
}

impl Default for CdnSection {
    fn default() -> Self {
        Self {
            zone_id: String::new(),
            api_token: None,
            purge_endpoint: None,
            batch_size: DEFAULT_BATCH_SIZE,
            limit_per_minute: DEFAULT_LIMIT_PER_MINUTE,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`, `"warn"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("cannot read {}", p.display()))?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Switch to dry-run mode: writes go to the dump directory.
    pub fn force_dry_run(&mut self) {
        self.publish.dry_run = true;
        self.storage.backend = Backend::File;
    }

    /// Upstream settings in the builder's terms.
    pub fn upstream_config(&self) -> UpstreamConfig {
        let u = &self.upstream;
        UpstreamConfig {
            group: u.group.clone(),
            maven_url: u.maven_url.clone(),
            fabric_maven_url: u.fabric_maven_url.clone(),
            game_manifest_url: u.game_manifest_url.clone(),
            loader_artifact: u.loader_artifact.clone(),
            installer_artifact: u.installer_artifact.clone(),
            mappings_artifact: u.mappings_artifact.clone(),
            hashed_artifact: u.hashed_artifact.clone(),
            intermediary_group: u.intermediary_group.clone(),
            intermediary_artifact: u.intermediary_artifact.clone(),
            fetch_concurrency: u.fetch_concurrency,
            enrich_libraries: u.enrich_libraries,
            user_agent: u.user_agent.clone(),
        }
    }

    /// CDN batch size and quota.
    pub fn purge_limits(&self) -> PurgeLimits {
        PurgeLimits {
            batch_size: self.cdn.batch_size,
            limit_per_minute: self.cdn.limit_per_minute,
        }
    }

    /// Reject configurations that cannot work, before any I/O.
    ///
    /// `live` is set for runs that mutate published state and purge the CDN.
    pub fn validate(&self, live: bool) -> anyhow::Result<()> {
        if self.publish.upload_concurrency == 0 {
            bail!("publish.upload_concurrency must be at least 1");
        }
        if self.upstream.fetch_concurrency == 0 {
            bail!("upstream.fetch_concurrency must be at least 1");
        }
        self.purge_limits()
            .validate()
            .context("invalid [cdn] limits")?;

        if self.storage.backend == Backend::B2 {
            if self.storage.bucket.is_empty() {
                bail!("storage.bucket is required for the b2 backend");
            }
            if self.storage.key_id.is_none() || self.storage.application_key.is_none() {
                bail!("B2 credentials missing: set B2_APP_KEY_ID and B2_APP_KEY");
            }
        }

        if live {
            if self.cdn.api_token.is_none() {
                bail!("CDN token missing: set CF_KEY");
            }
            if self.cdn.zone_id.is_empty() && self.cdn.purge_endpoint.is_none() {
                bail!("cdn.zone_id is required to purge");
            }
        }
        Ok(())
    }
}
