//! The `v3/versions/...` JSON documents.
//!
//! Every document is a pure function of [`UpstreamData`]; the only
//! run-dependent input is the profile timestamp, which is kept out of the
//! cache snapshot (see [`crate::profile`]).

use std::collections::{BTreeMap, HashSet};

use metasync_upstream::{GameVersion, MavenArtifact};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::artifact_set::ArtifactSet;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::profile::{Side, build_profile};
use crate::source::ArtifactSource;
use crate::upstream::UpstreamData;
use crate::version;

/// `{maven, version}`, used for hashed and intermediary listings.
#[derive(Debug, Clone, Serialize)]
pub struct MavenEntry {
    /// Maven coordinate.
    pub maven: String,
    /// Version string.
    pub version: String,
}

impl From<&MavenArtifact> for MavenEntry {
    fn from(artifact: &MavenArtifact) -> Self {
        Self {
            maven: artifact.maven_id(),
            version: artifact.version.clone(),
        }
    }
}

/// One mappings release.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingsEntry {
    /// Targeted game version.
    pub game_version: String,
    /// `+build.` or `.`.
    pub separator: &'static str,
    /// Build number.
    pub build: u32,
    /// Maven coordinate.
    pub maven: String,
    /// Full version string.
    pub version: String,
    /// Hashed mappings version it builds on.
    pub hashed: String,
}

/// One installer release.
#[derive(Debug, Clone, Serialize)]
pub struct InstallerEntry {
    /// Jar URL.
    pub url: String,
    /// Maven coordinate.
    pub maven: String,
    /// Version string.
    pub version: String,
}

/// One loader release.
#[derive(Debug, Clone, Serialize)]
pub struct LoaderEntry {
    /// `+build.` or `.`.
    pub separator: &'static str,
    /// Build number.
    pub build: u32,
    /// Maven coordinate.
    pub maven: String,
    /// Version without its `+build.<n>` suffix.
    pub version: String,
}

/// A loader paired with a game version.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoaderGameEntry<'a> {
    loader: &'a LoaderEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    hashed: Option<MavenEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intermediary: Option<MavenEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    launcher_meta: Option<&'a Value>,
}

#[derive(Serialize)]
struct VersionsSummary<'a> {
    game: &'a [GameVersion],
    mappings: &'a [MappingsEntry],
    hashed: &'a [MavenEntry],
    loader: &'a [LoaderEntry],
    installer: &'a [InstallerEntry],
}

/// Generates every metadata document from upstream data.
pub struct MetaDocuments<'a> {
    data: &'a UpstreamData,
    context: &'a BuildContext,
}

impl<'a> MetaDocuments<'a> {
    /// Documents for `data`, stamped with `context`.
    pub fn new(data: &'a UpstreamData, context: &'a BuildContext) -> Self {
        Self { data, context }
    }

    fn mappings(&self, set: &ArtifactSet) -> Result<Vec<MappingsEntry>, BuildError> {
        let mut entries = Vec::with_capacity(self.data.mappings.len());
        for artifact in self.data.mappings.iter() {
            let game_version = version::game_version(&artifact.version)?.to_string();
            entries.push(MappingsEntry {
                hashed: game_version.clone(),
                game_version,
                separator: version::separator(&artifact.version),
                build: version::build_number(&artifact.version)?,
                maven: artifact.maven_id(),
                version: artifact.version.clone(),
            });
        }
        info!(count = entries.len(), "found mappings");

        let games = first_seen(entries.iter().map(|e| e.game_version.as_str()));
        set.insert_json("v3/versions/game/quilt-mappings", &games)?;
        set.insert_json("v3/versions/quilt-mappings", &entries)?;
        for (game, group) in group_by(&entries, |e| e.game_version.as_str()) {
            set.insert_json(format!("v3/versions/quilt-mappings/{game}"), &group)?;
        }
        Ok(entries)
    }

    /// Hashed or intermediary listings, which share one shape.
    fn maven_listing(
        &self,
        set: &ArtifactSet,
        name: &str,
        artifacts: &[MavenArtifact],
    ) -> Result<Vec<MavenEntry>, BuildError> {
        let entries: Vec<MavenEntry> = artifacts.iter().map(MavenEntry::from).collect();

        let versions = first_seen(entries.iter().map(|e| e.version.as_str()));
        set.insert_json(format!("v3/versions/game/{name}"), &versions)?;
        set.insert_json(format!("v3/versions/{name}"), &entries)?;
        for (version, group) in group_by(&entries, |e| e.version.as_str()) {
            set.insert_json(format!("v3/versions/{name}/{version}"), &group)?;
        }
        Ok(entries)
    }

    fn installer(&self, set: &ArtifactSet) -> Result<Vec<InstallerEntry>, BuildError> {
        let entries: Vec<InstallerEntry> = self
            .data
            .installer
            .iter()
            .map(|a| InstallerEntry {
                url: a.jar_url(),
                maven: a.maven_id(),
                version: a.version.clone(),
            })
            .collect();
        info!(count = entries.len(), "found installers");
        set.insert_json("v3/versions/installer", &entries)?;
        Ok(entries)
    }

    fn loader(&self, set: &ArtifactSet) -> Result<Vec<LoaderEntry>, BuildError> {
        let mut entries = Vec::with_capacity(self.data.loader.len());
        for artifact in self.data.loader.iter() {
            entries.push(LoaderEntry {
                separator: version::separator(&artifact.version),
                build: version::build_number(&artifact.version)?,
                maven: artifact.maven_id(),
                version: version::without_build(&artifact.version).to_string(),
            });
        }
        set.insert_json("v3/versions/loader", &entries)?;
        Ok(entries)
    }

    /// `v3/versions/loader/<game>` and `v3/versions/loader/<game>/<loader>`.
    fn loader_game(&self, set: &ArtifactSet, loaders: &[LoaderEntry]) -> Result<(), BuildError> {
        self.data.game.par_iter().try_for_each(|game| {
            let hashed = self.data.hashed_for(&game.version).map(MavenEntry::from);
            let intermediary = self.data.intermediary_for(&game.version).map(MavenEntry::from);

            let mut per_game = Vec::with_capacity(loaders.len());
            for loader in loaders {
                let entry = LoaderGameEntry {
                    loader,
                    hashed: hashed.clone(),
                    intermediary: intermediary.clone(),
                    launcher_meta: self
                        .data
                        .launcher_meta
                        .get(&loader.maven)
                        .map(|m| m.as_value()),
                };
                set.insert_json(
                    format!("v3/versions/loader/{}/{}", game.version, loader.version),
                    &entry,
                )?;
                per_game.push(entry);
            }
            set.insert_json(format!("v3/versions/loader/{}", game.version), &per_game)
        })?;

        info!(
            count = self.data.game.len() * loaders.len(),
            "generated loader versions"
        );
        Ok(())
    }

    /// Launcher profiles for every side × game × loader.
    fn profiles(&self, set: &ArtifactSet, loaders: &[LoaderEntry]) -> Result<(), BuildError> {
        let jobs: Vec<(Side, &GameVersion)> = Side::ALL
            .iter()
            .flat_map(|side| self.data.game.iter().map(move |g| (*side, g)))
            .collect();

        jobs.par_iter().try_for_each(|(side, game)| {
            for loader in loaders {
                let artifact = build_profile(
                    self.data,
                    self.context,
                    *side,
                    &game.version,
                    loader,
                )?;
                set.insert(artifact)?;
            }
            Ok::<_, BuildError>(())
        })?;

        info!(
            count = self.data.game.len() * loaders.len(),
            "generated loader profiles"
        );
        Ok(())
    }
}

impl ArtifactSource for MetaDocuments<'_> {
    fn name(&self) -> &'static str {
        "metadata documents"
    }

    fn produce(&self, set: &ArtifactSet) -> Result<(), BuildError> {
        let game = &self.data.game;
        info!(count = game.len(), "found game versions");

        let mappings = self.mappings(set)?;
        let hashed = self.maven_listing(set, "hashed", &self.data.hashed.versions)?;
        self.maven_listing(set, "intermediary", &self.data.intermediary.versions)?;
        let installer = self.installer(set)?;
        let loader = self.loader(set)?;

        set.insert_json("v3/versions/game", game)?;
        set.insert_json(
            "v3/versions",
            &VersionsSummary {
                game,
                mappings: &mappings,
                hashed: &hashed,
                loader: &loader,
                installer: &installer,
            },
        )?;

        self.loader_game(set, &loader)?;
        self.profiles(set, &loader)?;
        Ok(())
    }
}

/// Distinct values in first-seen order.
fn first_seen<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

/// Group entries by key, keeping listing order within each group.
fn group_by<'a, T>(
    entries: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
) -> BTreeMap<&'a str, Vec<&'a T>> {
    let mut groups: BTreeMap<&str, Vec<&T>> = BTreeMap::new();
    for entry in entries {
        groups.entry(key(entry)).or_default().push(entry);
    }
    groups
}
