//! Per-loader launcher metadata.
//!
//! Each loader version publishes a JSON document next to its jar describing
//! the libraries and main classes a launcher needs. The document is embedded
//! verbatim in generated output, so it is kept as a JSON value with typed
//! accessors for the fields profiles are built from.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::UpstreamError;
use crate::fetch::{Fetcher, fetch_json};
use crate::maven::MavenArtifact;

/// Launcher metadata for one loader version.
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherMeta(Value);

impl LauncherMeta {
    /// Wrap an already-parsed document.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The document as published upstream.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Libraries listed under `libraries.<key>`; empty if absent.
    pub fn libraries(&self, key: &str) -> Vec<Value> {
        self.0
            .get("libraries")
            .and_then(|l| l.get(key))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `libraries.<key>` is present.
    pub fn has_libraries(&self, key: &str) -> bool {
        self.0
            .get("libraries")
            .and_then(|l| l.get(key))
            .is_some_and(Value::is_array)
    }

    /// `mainClass.<key>`, when `mainClass` is an object.
    pub fn main_class(&self, key: &str) -> Option<&str> {
        self.0
            .get("mainClass")
            .filter(|m| m.is_object())
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
    }
}

/// URL of the launcher metadata for a loader artifact.
pub fn launcher_meta_url(loader: &MavenArtifact) -> String {
    loader.file_url("json")
}

/// Fetch launcher metadata for every loader, keyed by maven id.
///
/// At most `max_concurrent` requests are in flight. Any failure, including a
/// missing document, fails the whole fetch.
pub async fn fetch_launcher_meta(
    fetcher: Arc<dyn Fetcher>,
    loaders: &[MavenArtifact],
    max_concurrent: usize,
) -> Result<HashMap<String, LauncherMeta>, UpstreamError> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();

    for loader in loaders {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await?;
        let fetcher = fetcher.clone();
        let maven_id = loader.maven_id();
        let url = launcher_meta_url(loader);

        tasks.spawn(async move {
            let _permit = permit;
            debug!(%maven_id, %url, "fetching launcher metadata");
            let value: Value = fetch_json(fetcher.as_ref(), &url).await?;
            Ok::<_, UpstreamError>((maven_id, LauncherMeta(value)))
        });
    }

    let mut metas = HashMap::with_capacity(loaders.len());
    while let Some(joined) = tasks.join_next().await {
        let (maven_id, meta) = joined??;
        metas.insert(maven_id, meta);
    }

    info!(count = metas.len(), "fetched launcher metadata");
    Ok(metas)
}
