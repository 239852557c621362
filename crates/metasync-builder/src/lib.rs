//! Artifact set builder for metasync.
//!
//! Turns fully-fetched upstream data into the complete set of documents to
//! publish:
//!
//! - [`ArtifactSet`]: concurrent path → artifact map with collision checks.
//! - [`UpstreamData`]: every upstream source, fetched behind one barrier.
//! - [`MetaDocuments`]: the `v3/versions/...` documents and launcher profiles.
//! - [`StaticFiles`]: files copied verbatim from a directory.
//! - [`MetaBuilder`]: the whole stage as an [`ArtifactProvider`].

pub mod artifact_set;
pub mod context;
pub mod documents;
pub mod error;
pub mod profile;
pub mod provider;
pub mod source;
pub mod upstream;
pub mod version;

pub use artifact_set::ArtifactSet;
pub use context::{BuildContext, TIMESTAMP_FORMAT};
pub use documents::{InstallerEntry, LoaderEntry, MappingsEntry, MavenEntry, MetaDocuments};
pub use error::BuildError;
pub use profile::{Side, SideFields, build_profile, profile_path};
pub use provider::{ArtifactProvider, FixedArtifacts, MetaBuilder};
pub use source::{ArtifactSource, StaticFiles, build_all};
pub use upstream::{DEFAULT_FABRIC_MAVEN_URL, DEFAULT_MAVEN_URL, UpstreamConfig, UpstreamData};

#[cfg(test)]
mod fixture;
