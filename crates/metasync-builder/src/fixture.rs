//! A small, complete upstream served from memory.

use std::sync::Arc;

use metasync_upstream::MemoryFetcher;
use serde_json::json;

use crate::upstream::UpstreamConfig;

pub(crate) const MAVEN: &str = "https://maven.test/release/";
pub(crate) const FABRIC: &str = "https://fabric.test/";
pub(crate) const MANIFEST: &str = "https://launcher.test/version_manifest.json";

pub(crate) const LOADERS: [&str; 2] = ["0.16.0", "0.17.0-beta.1"];
pub(crate) const GAMES: [&str; 2] = ["1.19", "1.18.2"];

fn metadata_xml(group: &str, artifact: &str, versions: &[&str]) -> String {
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

pub(crate) fn launcher_meta(loader: &str) -> serde_json::Value {
    json!({
        "version": 1,
        "min_java_version": 17,
        "libraries": {
            "client": [],
            "common": [{"name": format!("org.quiltmc:common-dep:{loader}"), "url": MAVEN}],
            "server": [{"name": "net.fabricmc:server-dep:1", "url": FABRIC}],
            "development": []
        },
        "mainClass": {
            "client": "org.quiltmc.loader.impl.launch.knot.KnotClient",
            "server": "org.quiltmc.loader.impl.launch.knot.KnotServer",
            "serverLauncher": "org.quiltmc.loader.impl.launch.server.QuiltServerLauncher"
        }
    })
}

/// Fetcher and config for the fixture upstream. Enrichment is off.
pub(crate) fn upstream() -> (Arc<MemoryFetcher>, UpstreamConfig) {
    let fetcher = MemoryFetcher::new()
        .with(
            format!("{MAVEN}org/quiltmc/quilt-mappings/maven-metadata.xml"),
            metadata_xml(
                "org.quiltmc",
                "quilt-mappings",
                &["1.18.2+build.1", "1.19+build.1", "1.19+build.2"],
            ),
        )
        .with(
            format!("{MAVEN}org/quiltmc/hashed/maven-metadata.xml"),
            metadata_xml("org.quiltmc", "hashed", &["1.18.2", "1.19"]),
        )
        .with(
            format!("{FABRIC}net/fabricmc/intermediary/maven-metadata.xml"),
            metadata_xml("net.fabricmc", "intermediary", &["1.18.2", "1.19"]),
        )
        .with(
            format!("{MAVEN}org/quiltmc/quilt-installer/maven-metadata.xml"),
            metadata_xml("org.quiltmc", "quilt-installer", &["0.4.0", "0.4.1"]),
        )
        .with(
            format!("{MAVEN}org/quiltmc/quilt-loader/maven-metadata.xml"),
            metadata_xml("org.quiltmc", "quilt-loader", &LOADERS),
        )
        .with(
            MANIFEST,
            json!({
                "versions": [
                    {"id": "22w24a", "type": "snapshot"},
                    {"id": "1.19", "type": "release"},
                    {"id": "1.18.2", "type": "release"}
                ]
            })
            .to_string(),
        );

    for loader in LOADERS {
        fetcher.insert(
            format!("{MAVEN}org/quiltmc/quilt-loader/{loader}/quilt-loader-{loader}.json"),
            launcher_meta(loader).to_string(),
        );
    }

    let config = UpstreamConfig {
        maven_url: MAVEN.into(),
        fabric_maven_url: FABRIC.into(),
        game_manifest_url: MANIFEST.into(),
        fetch_concurrency: 4,
        enrich_libraries: false,
        ..UpstreamConfig::default()
    };
    (Arc::new(fetcher), config)
}
