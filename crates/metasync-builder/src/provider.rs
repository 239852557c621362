//! The whole builder stage as one async call.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use metasync_types::Artifact;
use metasync_upstream::Fetcher;
use tracing::info;

use crate::artifact_set::ArtifactSet;
use crate::context::BuildContext;
use crate::documents::MetaDocuments;
use crate::error::BuildError;
use crate::source::{ArtifactSource, StaticFiles, build_all};
use crate::upstream::{UpstreamConfig, UpstreamData};

/// Produces the complete artifact set for a run.
#[async_trait::async_trait]
pub trait ArtifactProvider: Send + Sync {
    /// Fetch whatever is needed and build every artifact.
    async fn provide(&self) -> Result<ArtifactSet, BuildError>;
}

/// Builds the metadata documents from live upstream sources.
pub struct MetaBuilder {
    fetcher: Arc<dyn Fetcher>,
    upstream: UpstreamConfig,
    static_dir: Option<PathBuf>,
    context: Option<BuildContext>,
}

impl MetaBuilder {
    /// A builder reading upstream data through `fetcher`.
    pub fn new(fetcher: Arc<dyn Fetcher>, upstream: UpstreamConfig) -> Self {
        Self {
            fetcher,
            upstream,
            static_dir: None,
            context: None,
        }
    }

    /// Also publish the files under `dir`.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Use a fixed context instead of stamping each run with the current time.
    pub fn with_context(mut self, context: BuildContext) -> Self {
        self.context = Some(context);
        self
    }
}

#[async_trait::async_trait]
impl ArtifactProvider for MetaBuilder {
    async fn provide(&self) -> Result<ArtifactSet, BuildError> {
        info!("gathering data");
        let data = UpstreamData::fetch(self.fetcher.clone(), &self.upstream).await?;
        let context = self.context.clone().unwrap_or_else(BuildContext::now);
        let static_dir = self.static_dir.clone();

        info!("generating documents");
        tokio::task::spawn_blocking(move || {
            let documents = MetaDocuments::new(&data, &context);
            let statics = static_dir.map(StaticFiles::new);
            let mut sources: Vec<&dyn ArtifactSource> = vec![&documents];
            if let Some(statics) = &statics {
                sources.push(statics);
            }
            build_all(&sources)
        })
        .await?
    }
}

/// Serves a fixed list of artifacts, replaceable between runs.
#[derive(Default)]
pub struct FixedArtifacts {
    artifacts: RwLock<Vec<Artifact>>,
}

impl FixedArtifacts {
    /// Serve `artifacts` until replaced.
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self {
            artifacts: RwLock::new(artifacts),
        }
    }

    /// Serve `artifacts` from the next run on.
    pub fn replace(&self, artifacts: Vec<Artifact>) {
        *self.artifacts.write().expect("lock poisoned") = artifacts;
    }
}

#[async_trait::async_trait]
impl ArtifactProvider for FixedArtifacts {
    async fn provide(&self) -> Result<ArtifactSet, BuildError> {
        let set = ArtifactSet::new();
        for artifact in self.artifacts.read().expect("lock poisoned").iter() {
            set.insert(artifact.clone())?;
        }
        Ok(set)
    }
}
