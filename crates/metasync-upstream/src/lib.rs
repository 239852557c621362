//! Upstream data sources for metasync.
//!
//! Everything here is a pure producer: it reads remote repositories and
//! returns typed data, never publishing anything itself.
//!
//! - [`Fetcher`]: "fetch bytes for a URL", over HTTP ([`HttpFetcher`]) or
//!   from memory ([`MemoryFetcher`]).
//! - [`MavenRepository`]: version listings from `maven-metadata.xml`.
//! - [`GameManifest`]: the game-version manifest.
//! - [`LauncherMeta`]: per-loader launcher metadata.
//! - [`Library`]: profile libraries and their optional checksum enrichment.

pub mod error;
pub mod fetch;
pub mod launcher;
pub mod library;
pub mod maven;
pub mod minecraft;

pub use error::UpstreamError;
pub use fetch::{DEFAULT_USER_AGENT, Fetcher, HttpFetcher, MemoryFetcher, fetch_json};
pub use launcher::{LauncherMeta, fetch_launcher_meta, launcher_meta_url};
pub use library::{Library, enrich, enrich_all};
pub use maven::{ArtifactMetadata, MavenArtifact, MavenRepository};
pub use minecraft::{DEFAULT_GAME_MANIFEST_URL, GameManifest, GameVersion};
