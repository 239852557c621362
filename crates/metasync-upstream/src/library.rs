//! Profile libraries and checksum enrichment.
//!
//! A library is a Maven coordinate plus the repository it lives in. When
//! enrichment is enabled, its checksums and size are looked up: first in the
//! Gradle `.module` file (the first file of the `runtimeElements` variant),
//! then in the `.md5`/`.sha1`/`.sha256`/`.sha512` sidecars next to the jar.
//! Enrichment never fails a run; a library whose data cannot be found is
//! published without it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::UpstreamError;
use crate::fetch::Fetcher;
use crate::maven::MavenArtifact;

/// One entry of a launcher profile's `libraries` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Library {
    /// Maven coordinate.
    pub name: String,
    /// Repository root.
    pub url: String,
    /// MD5 of the artifact file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    /// SHA-1 of the artifact file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    /// SHA-256 of the artifact file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// SHA-512 of the artifact file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha512: Option<String>,
    /// Artifact file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Library {
    /// A library with no checksum data.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            md5: None,
            sha1: None,
            sha256: None,
            sha512: None,
            size: None,
        }
    }

    /// Whether checksum data has been attached.
    pub fn is_enriched(&self) -> bool {
        self.sha1.is_some()
    }
}

#[derive(Deserialize)]
struct ModuleData {
    #[serde(default)]
    variants: Vec<ModuleVariant>,
}

#[derive(Deserialize)]
struct ModuleVariant {
    name: String,
    #[serde(default)]
    files: Vec<ModuleFile>,
}

#[derive(Deserialize)]
struct ModuleFile {
    size: Option<u64>,
    md5: Option<String>,
    sha1: Option<String>,
    sha256: Option<String>,
    sha512: Option<String>,
}

/// Attach checksums and size to `library`.
///
/// `extension` is the file extension of the artifact (`jar`).
pub async fn enrich(fetcher: &dyn Fetcher, library: Library, extension: &str) -> Library {
    let artifact = match MavenArtifact::parse(&library.name, &library.url) {
        Ok(a) => a,
        Err(e) => {
            warn!(library = %library.name, error = %e, "could not append additional data");
            return library;
        }
    };

    if let Some(file) = module_runtime_file(fetcher, &artifact).await {
        debug!(library = %library.name, "enriched from module data");
        return Library {
            md5: file.md5,
            sha1: file.sha1,
            sha256: file.sha256,
            sha512: file.sha512,
            size: file.size,
            ..library
        };
    }

    match sidecar_checksums(fetcher, &artifact, extension).await {
        Ok(enriched) => {
            debug!(library = %library.name, "enriched from checksum files");
            Library {
                name: library.name,
                url: library.url,
                ..enriched
            }
        }
        Err(e) => {
            warn!(
                library = %library.name,
                version = %artifact.version,
                artifact = %artifact.artifact,
                error = %e,
                "could not append additional data"
            );
            library
        }
    }
}

async fn module_runtime_file(
    fetcher: &dyn Fetcher,
    artifact: &MavenArtifact,
) -> Option<ModuleFile> {
    let url = artifact.file_url("module");
    let body = match fetcher.fetch(&url).await {
        Ok(Some(body)) => body,
        Ok(None) => return None,
        Err(e) => {
            debug!(%url, error = %e, "module data unavailable");
            return None;
        }
    };

    let data: ModuleData = match serde_json::from_slice(&body) {
        Ok(data) => data,
        Err(e) => {
            debug!(%url, error = %e, "module data unreadable");
            return None;
        }
    };

    data.variants
        .into_iter()
        .find(|v| v.name == "runtimeElements")
        .and_then(|v| v.files.into_iter().next())
}

async fn sidecar_checksums(
    fetcher: &dyn Fetcher,
    artifact: &MavenArtifact,
    extension: &str,
) -> Result<Library, UpstreamError> {
    let file_url = artifact.file_url(extension);
    let sidecar = |digest: &str| format!("{file_url}.{digest}");

    let md5 = first_token(&fetcher.fetch_required(&sidecar("md5")).await?);
    let sha1 = first_token(&fetcher.fetch_required(&sidecar("sha1")).await?);
    let sha256 = first_token(&fetcher.fetch_required(&sidecar("sha256")).await?);
    let sha512 = first_token(&fetcher.fetch_required(&sidecar("sha512")).await?);
    let size = fetcher
        .content_length(&file_url)
        .await?
        .ok_or_else(|| UpstreamError::NotFound(file_url.clone()))?;

    Ok(Library {
        name: String::new(),
        url: String::new(),
        md5: Some(md5),
        sha1: Some(sha1),
        sha256: Some(sha256),
        sha512: Some(sha512),
        size: Some(size),
    })
}

/// The digest in a checksum file: its first whitespace-separated token.
fn first_token(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Enrich every library, keyed by coordinate.
///
/// Duplicate coordinates are looked up once. At most `max_concurrent`
/// libraries are looked up at a time.
pub async fn enrich_all(
    fetcher: Arc<dyn Fetcher>,
    libraries: impl IntoIterator<Item = Library>,
    max_concurrent: usize,
) -> Result<HashMap<String, Library>, UpstreamError> {
    let mut unique: HashMap<String, Library> = HashMap::new();
    for library in libraries {
        unique.entry(library.name.clone()).or_insert(library);
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks = JoinSet::new();
    for (_, library) in unique {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await?;
        let fetcher = fetcher.clone();
        tasks.spawn(async move {
            let _permit = permit;
            enrich(fetcher.as_ref(), library, "jar").await
        });
    }

    let mut enriched = HashMap::new();
    while let Some(joined) = tasks.join_next().await {
        let library = joined?;
        enriched.insert(library.name.clone(), library);
    }

    let complete = enriched.values().filter(|l| l.is_enriched()).count();
    info!(
        libraries = enriched.len(),
        enriched = complete,
        "library checksums gathered"
    );
    Ok(enriched)
}
