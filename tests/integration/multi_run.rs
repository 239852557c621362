//! Publishing the same deployment repeatedly as upstream moves.

use metasync_builder::{Side, profile_path};
use metasync_engine::PublishOptions;
use metasync_state::DEFAULT_MANIFEST_PATH;
use metasync_tests::{BASE_URL, Deployment, Upstream};

const DOCUMENTS: usize = 30;

#[tokio::test]
async fn first_run_publishes_and_purges_every_document() {
    let deployment = Deployment::new();
    let upstream = Upstream::default();

    let summary = deployment
        .publisher(upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    assert_eq!(summary.changed.len(), DOCUMENTS);
    assert_eq!(summary.stats.added, DOCUMENTS);
    assert_eq!(deployment.documents(), summary.changed);
    assert_eq!(deployment.manifest().await.len(), DOCUMENTS);

    let purged = deployment.purger.urls();
    assert_eq!(purged.len(), DOCUMENTS);
    assert!(purged.iter().all(|u| u.starts_with(BASE_URL)));
    assert!(purged.contains(&format!("{BASE_URL}v3/versions/loader/1.19/0.17.0")));
    // 30 URLs fit in one batch.
    assert_eq!(deployment.purger.batches().len(), 1);

    let game = deployment.json("v3/versions/game");
    assert_eq!(game[0]["version"], "1.19");
    assert_eq!(game[0]["stable"], true);
}

#[tokio::test]
async fn rerun_with_same_upstream_changes_nothing() {
    let deployment = Deployment::new();
    let upstream = Upstream::default();
    deployment
        .publisher(upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap();
    let profile = profile_path("1.19", "0.16.0", Side::Client);
    let first_bytes = deployment.store.object(&profile).unwrap().data;

    // A later run stamps profiles with a different time.
    let summary = deployment
        .publisher(upstream.builder(7), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    assert!(summary.changed.is_empty());
    assert!(summary.stale.is_empty());
    assert_eq!(summary.stats.unchanged, DOCUMENTS);
    assert_eq!(summary.sync.uploaded, 0);
    assert_eq!(deployment.purger.batches().len(), 1);
    assert_eq!(deployment.store.object(&profile).unwrap().data, first_bytes);
}

#[tokio::test]
async fn new_loader_release_touches_only_affected_documents() {
    let deployment = Deployment::new();
    let mut upstream = Upstream::default();
    deployment
        .publisher(upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    upstream.loaders.push("0.18.0".into());
    let summary = deployment
        .publisher(upstream.builder(1), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    let mut expected = vec![
        "v3/versions".to_string(),
        "v3/versions/loader".to_string(),
        "v3/versions/loader/1.19".to_string(),
        "v3/versions/loader/1.18.2".to_string(),
        "v3/versions/loader/1.19/0.18.0".to_string(),
        "v3/versions/loader/1.18.2/0.18.0".to_string(),
    ];
    for game in ["1.19", "1.18.2"] {
        for side in Side::ALL {
            expected.push(profile_path(game, "0.18.0", side));
        }
    }
    expected.sort();

    assert_eq!(summary.changed, expected);
    assert_eq!(summary.stats.added, 6);
    assert_eq!(summary.stats.changed, 4);
    assert!(summary.stale.is_empty());

    let purged: Vec<String> = deployment.purger.batches()[1].clone();
    let expected_urls: Vec<String> = expected.iter().map(|p| format!("{BASE_URL}{p}")).collect();
    assert_eq!(purged, expected_urls);

    let loaders = deployment.json("v3/versions/loader");
    assert_eq!(loaders[0]["version"], "0.18.0");
    assert_eq!(deployment.manifest().await.len(), DOCUMENTS + 6);
}

#[tokio::test]
async fn dropped_game_version_is_deleted_everywhere() {
    let deployment = Deployment::new();
    let mut upstream = Upstream::default();
    deployment
        .publisher(upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    upstream.games.retain(|g| g != "1.18.2");
    let summary = deployment
        .publisher(upstream.builder(1), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    // Per-version listings, the loader list, two pairs and four profiles.
    assert_eq!(summary.stale.len(), 10);
    assert!(summary.stale.iter().all(|p| p.contains("1.18.2")));
    assert_eq!(summary.sync.deleted, 10);

    assert!(deployment.documents().iter().all(|p| !p.contains("1.18.2")));
    let manifest = deployment.manifest().await;
    assert!(manifest.paths().all(|p| !p.contains("1.18.2")));
    assert_eq!(manifest.len(), DOCUMENTS - 10);

    // Listings that mentioned the dropped version were republished.
    assert!(summary.changed.contains(&"v3/versions/game".to_string()));
    assert!(summary.changed.contains(&"v3/versions/game/hashed".to_string()));
    // Stale paths are removed from storage, not purged.
    let purged = deployment.purger.batches()[1].clone();
    assert!(purged.iter().all(|u| !u.contains("1.18.2")));
}

#[tokio::test]
async fn reupload_all_rewrites_everything_and_deletes_dropped_documents() {
    let deployment = Deployment::new();
    let mut upstream = Upstream::default();
    deployment
        .publisher(upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    upstream.games.retain(|g| g != "1.18.2");
    let options = PublishOptions {
        reupload_all: true,
        ..PublishOptions::default()
    };
    let summary = deployment
        .publisher(upstream.builder(1), options)
        .publish()
        .await
        .unwrap();

    assert_eq!(summary.changed.len(), DOCUMENTS - 10);
    assert_eq!(summary.sync.uploaded, DOCUMENTS - 10);
    assert_eq!(summary.stale.len(), 10);
    assert!(deployment.store.object("v3/versions/hashed/1.18.2").is_none());
    assert!(deployment.documents().iter().all(|p| !p.contains("1.18.2")));
    assert_eq!(deployment.manifest().await.len(), DOCUMENTS - 10);
    assert!(deployment.store.object(DEFAULT_MANIFEST_PATH).is_some());

    // A normal run afterwards has nothing left to clean up.
    let again = deployment
        .publisher(upstream.builder(2), PublishOptions::default())
        .publish()
        .await
        .unwrap();
    assert!(again.changed.is_empty());
    assert!(again.stale.is_empty());
}
