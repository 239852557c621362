//! Launcher profiles.
//!
//! A profile is published at
//! `v3/versions/loader/<game>/<loader>/<segment>/json` for each [`Side`].
//! The published bytes carry `releaseTime` and `time`, which change every
//! run; the cache snapshot is the same document without them.

use metasync_types::Artifact;
use serde::Serialize;
use serde_json::Value;

use crate::context::BuildContext;
use crate::documents::LoaderEntry;
use crate::error::BuildError;
use crate::upstream::UpstreamData;

/// Which launcher a profile targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The game client.
    Client,
    /// The dedicated server.
    Server,
}

/// Names a [`Side`] uses in launcher metadata and in published paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideFields {
    /// Key in launcher metadata (`libraries.<key>`, `mainClass.<key>`).
    pub key: &'static str,
    /// Path segment of the profile document.
    pub segment: &'static str,
    /// `mainClass` key of the launcher wrapper, if this side has one.
    pub launcher_main_class: Option<&'static str>,
}

impl Side {
    /// Both sides.
    pub const ALL: [Side; 2] = [Side::Client, Side::Server];

    const CLIENT: SideFields = SideFields {
        key: "client",
        segment: "profile",
        launcher_main_class: None,
    };

    const SERVER: SideFields = SideFields {
        key: "server",
        segment: "server",
        launcher_main_class: Some("serverLauncher"),
    };

    /// Everything this side names.
    pub const fn fields(self) -> SideFields {
        match self {
            Side::Client => Self::CLIENT,
            Side::Server => Self::SERVER,
        }
    }

    /// Key of this side in launcher metadata.
    pub const fn key(self) -> &'static str {
        self.fields().key
    }

    /// Path segment of this side's profile document.
    pub const fn segment(self) -> &'static str {
        self.fields().segment
    }
}

#[derive(Serialize)]
struct Arguments {
    game: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Profile<'a> {
    id: String,
    inherits_from: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    main_class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    launcher_main_class: Option<&'a str>,
    arguments: Arguments,
    libraries: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_time: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<&'a str>,
}

/// Path of a profile document.
pub fn profile_path(game: &str, loader: &str, side: Side) -> String {
    format!("v3/versions/loader/{game}/{loader}/{}/json", side.segment())
}

/// Build the profile artifact for one side, game version and loader.
pub fn build_profile(
    data: &UpstreamData,
    context: &BuildContext,
    side: Side,
    game: &str,
    loader: &LoaderEntry,
) -> Result<Artifact, BuildError> {
    let meta = data
        .launcher_meta
        .get(&loader.maven)
        .ok_or_else(|| missing("launcher metadata", &loader.maven))?;
    let hashed = data
        .hashed_for(game)
        .ok_or_else(|| missing("hashed", game))?;
    let intermediary = data
        .intermediary_for(game)
        .ok_or_else(|| missing("intermediary", game))?;

    let mut libraries = meta.libraries("common");
    libraries.push(serde_json::to_value(
        data.library(&hashed.maven_id(), &data.maven_url),
    )?);
    libraries.push(serde_json::to_value(
        data.library(&intermediary.maven_id(), &data.fabric_maven_url),
    )?);
    libraries.push(serde_json::to_value(
        data.library(&loader.maven, &data.maven_url),
    )?);
    let fields = side.fields();
    libraries.extend(meta.libraries(fields.key));

    let mut profile = Profile {
        id: format!("{}-{}-{}", data.loader_artifact, loader.version, game),
        inherits_from: game,
        kind: "release",
        main_class: meta.main_class(fields.key),
        launcher_main_class: fields
            .launcher_main_class
            .and_then(|key| meta.main_class(key)),
        arguments: Arguments { game: Vec::new() },
        libraries,
        release_time: None,
        time: None,
    };

    let snapshot = serde_json::to_vec_pretty(&profile)?;
    profile.release_time = Some(context.generated_at.as_str());
    profile.time = Some(context.generated_at.as_str());
    let published = serde_json::to_vec_pretty(&profile)?;

    Ok(
        Artifact::json(profile_path(game, &loader.version, side), published)
            .with_snapshot(snapshot),
    )
}

fn missing(what: &'static str, key: &str) -> BuildError {
    BuildError::MissingUpstream {
        what,
        key: key.to_string(),
    }
}
