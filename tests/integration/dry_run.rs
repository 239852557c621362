//! Dry runs into a local dump directory.

use std::sync::Arc;

use metasync_engine::PublishOptions;
use metasync_state::{DEFAULT_MANIFEST_PATH, ManifestStore};
use metasync_store::{FileStore, ObjectStore};
use metasync_sync::SyncMode;
use metasync_tests::{Deployment, Upstream};

fn dry_run() -> PublishOptions {
    PublishOptions {
        mode: SyncMode::DryRun,
        ..PublishOptions::default()
    }
}

#[tokio::test]
async fn dry_run_writes_documents_and_manifest_into_dump_dir() {
    let dir = tempfile::tempdir().unwrap();
    let dump: Arc<dyn ObjectStore> = Arc::new(FileStore::new(dir.path()).unwrap());
    let deployment = Deployment::new();
    let upstream = Upstream::default();

    let summary = deployment
        .publisher_on(dump.clone(), upstream.builder(0), dry_run())
        .publish()
        .await
        .unwrap();

    assert!(summary.purge.is_none());
    assert!(deployment.purger.batches().is_empty());
    assert!(deployment.store.is_empty());

    // JSON documents gain an extension so a path can also be a directory.
    assert!(dir.path().join("v3/versions.json").is_file());
    assert!(dir.path().join("v3/versions/loader.json").is_file());
    assert!(dir.path().join(DEFAULT_MANIFEST_PATH).is_file());

    let manifest = ManifestStore::new(dump.clone(), DEFAULT_MANIFEST_PATH)
        .load()
        .await
        .unwrap();
    assert_eq!(manifest.len(), summary.changed.len());

    // The dump directory doubles as the baseline of the next dry run.
    let again = deployment
        .publisher_on(dump, upstream.builder(3), dry_run())
        .publish()
        .await
        .unwrap();
    assert!(again.changed.is_empty());
}

#[tokio::test]
async fn dry_run_keeps_stale_documents() {
    let dir = tempfile::tempdir().unwrap();
    let dump: Arc<dyn ObjectStore> = Arc::new(FileStore::new(dir.path()).unwrap());
    let deployment = Deployment::new();
    let mut upstream = Upstream::default();
    deployment
        .publisher_on(dump.clone(), upstream.builder(0), dry_run())
        .publish()
        .await
        .unwrap();

    upstream.games.retain(|g| g != "1.18.2");
    let summary = deployment
        .publisher_on(dump.clone(), upstream.builder(1), dry_run())
        .publish()
        .await
        .unwrap();

    assert_eq!(summary.stale.len(), 10);
    assert_eq!(summary.sync.skipped_deletes, 10);
    assert_eq!(summary.sync.deleted, 0);
    assert!(dir.path().join("v3/versions/hashed/1.18.2.json").is_file());
    assert!(
        dump.get("v3/versions/hashed/1.18.2")
            .await
            .unwrap()
            .is_some()
    );
}
