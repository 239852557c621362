//! Maven repository version listings.
//!
//! A listing comes from `<repo>/<group as path>/<artifact>/maven-metadata.xml`.
//! Repositories append new versions at the end of `versioning/versions`; the
//! listing is returned newest-first.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::UpstreamError;
use crate::fetch::Fetcher;

#[derive(Deserialize)]
struct MetadataXml {
    #[serde(default)]
    versioning: VersioningXml,
}

#[derive(Deserialize, Default)]
struct VersioningXml {
    #[serde(default)]
    versions: VersionsXml,
}

#[derive(Deserialize, Default)]
struct VersionsXml {
    #[serde(rename = "version", default)]
    version: Vec<String>,
}

/// A Maven repository reachable through a [`Fetcher`].
#[derive(Clone)]
pub struct MavenRepository {
    url: String,
    fetcher: Arc<dyn Fetcher>,
}

impl MavenRepository {
    /// A repository rooted at `url`.
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        let mut url = url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        Self { url, fetcher }
    }

    /// Repository root, always ending in `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL of the metadata document for `group:artifact`.
    pub fn metadata_url(&self, group: &str, artifact: &str) -> String {
        format!(
            "{}{}/{}/maven-metadata.xml",
            self.url,
            group.replace('.', "/"),
            artifact
        )
    }

    /// Every published version of `group:artifact`, newest first.
    pub async fn metadata(
        &self,
        group: &str,
        artifact: &str,
    ) -> Result<ArtifactMetadata, UpstreamError> {
        let url = self.metadata_url(group, artifact);
        let body = self.fetcher.fetch_required(&url).await?;
        let text = String::from_utf8_lossy(&body);
        let parsed: MetadataXml =
            quick_xml::de::from_str(&text).map_err(|source| UpstreamError::Xml {
                url: url.clone(),
                source,
            })?;

        let versions: Vec<MavenArtifact> = parsed
            .versioning
            .versions
            .version
            .into_iter()
            .rev()
            .map(|version| MavenArtifact {
                repository: self.url.clone(),
                group: group.to_string(),
                artifact: artifact.to_string(),
                version: version.trim().to_string(),
            })
            .collect();

        debug!(group, artifact, count = versions.len(), "read maven metadata");
        Ok(ArtifactMetadata {
            group: group.to_string(),
            artifact: artifact.to_string(),
            versions,
        })
    }
}

/// All versions of one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    /// Maven group id.
    pub group: String,
    /// Maven artifact id.
    pub artifact: String,
    /// Versions, newest first.
    pub versions: Vec<MavenArtifact>,
}

impl ArtifactMetadata {
    /// Whether `version` is listed.
    pub fn contains(&self, version: &str) -> bool {
        self.versions.iter().any(|a| a.version == version)
    }

    /// Versions in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &MavenArtifact> {
        self.versions.iter()
    }

    /// Number of versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether nothing is published.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// One version of an artifact in a specific repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    /// Repository root, ending in `/`.
    pub repository: String,
    /// Maven group id.
    pub group: String,
    /// Maven artifact id.
    pub artifact: String,
    /// Version string.
    pub version: String,
}

impl MavenArtifact {
    /// Parse a `group:artifact:version` coordinate hosted in `repository`.
    pub fn parse(coordinate: &str, repository: &str) -> Result<Self, UpstreamError> {
        let parts: Vec<&str> = coordinate.split(':').collect();
        let [group, artifact, version] = parts.as_slice() else {
            return Err(UpstreamError::InvalidCoordinate(coordinate.to_string()));
        };
        if group.is_empty() || artifact.is_empty() || version.is_empty() {
            return Err(UpstreamError::InvalidCoordinate(coordinate.to_string()));
        }
        let mut repository = repository.to_string();
        if !repository.ends_with('/') {
            repository.push('/');
        }
        Ok(Self {
            repository,
            group: group.to_string(),
            artifact: artifact.to_string(),
            version: version.to_string(),
        })
    }

    /// `group:artifact:version`.
    pub fn maven_id(&self) -> String {
        format!("{}:{}:{}", self.group, self.artifact, self.version)
    }

    /// Directory holding this version's files.
    pub fn folder_url(&self) -> String {
        format!(
            "{}{}/{}/{}/",
            self.repository,
            self.group.replace('.', "/"),
            self.artifact,
            self.version
        )
    }

    /// URL of `<artifact>-<version>.<extension>`.
    pub fn file_url(&self, extension: &str) -> String {
        format!(
            "{}{}-{}.{}",
            self.folder_url(),
            self.artifact,
            self.version,
            extension
        )
    }

    /// URL of the main jar.
    pub fn jar_url(&self) -> String {
        self.file_url("jar")
    }
}
