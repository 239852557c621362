//! Runs that fail part-way leave the previous baseline intact.

use std::sync::Arc;

use metasync_engine::{PublishError, PublishOptions};
use metasync_purge::{PurgeError, RecordingPurger};
use metasync_state::DEFAULT_MANIFEST_PATH;
use metasync_store::FaultyStore;
use metasync_sync::SyncError;
use metasync_tests::{Deployment, Upstream};

#[tokio::test]
async fn failed_upload_skips_purge_and_manifest() {
    let deployment = Deployment::new();
    let upstream = Upstream::default();
    let faulty =
        Arc::new(FaultyStore::new(deployment.store.clone()).fail_put("v3/versions/loader"));

    let err = deployment
        .publisher_on(faulty, upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap_err();

    match err {
        PublishError::Sync(SyncError::Failed {
            path,
            operation,
            report,
            ..
        }) => {
            assert_eq!(path, "v3/versions/loader");
            assert_eq!(operation, "upload");
            assert_eq!(report.failed, 1);
            assert_eq!(report.uploaded, 29);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(deployment.purger.batches().is_empty());
    assert!(deployment.store.object(DEFAULT_MANIFEST_PATH).is_none());

    // Without a baseline the next run uploads everything again.
    let summary = deployment
        .publisher(upstream.builder(1), PublishOptions::default())
        .publish()
        .await
        .unwrap();
    assert_eq!(summary.changed.len(), 30);
    assert_eq!(deployment.manifest().await.len(), 30);
}

#[tokio::test]
async fn failed_delete_keeps_previous_manifest() {
    let deployment = Deployment::new();
    let mut upstream = Upstream::default();
    deployment
        .publisher(upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap();
    let baseline = deployment.manifest().await;

    upstream.games.retain(|g| g != "1.18.2");
    let faulty = Arc::new(
        FaultyStore::new(deployment.store.clone()).fail_delete("v3/versions/loader/1.18.2"),
    );
    let err = deployment
        .publisher_on(faulty, upstream.builder(1), PublishOptions::default())
        .publish()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PublishError::Sync(SyncError::Failed {
            operation: "delete",
            ..
        })
    ));
    assert_eq!(deployment.manifest().await, baseline);

    // The retry finishes the deletion.
    let summary = deployment
        .publisher(upstream.builder(2), PublishOptions::default())
        .publish()
        .await
        .unwrap();
    assert_eq!(summary.stale.len(), 10);
    assert!(deployment.store.object("v3/versions/loader/1.18.2").is_none());
}

#[tokio::test]
async fn rejected_purge_reports_batch_and_keeps_manifest() {
    let deployment = Deployment::with_purger(RecordingPurger::failing_at(1, 403));
    let upstream = Upstream::default();

    let err = deployment
        .publisher(upstream.builder(0), PublishOptions::default())
        .publish()
        .await
        .unwrap_err();

    match err {
        PublishError::Purge(PurgeError::Rejected { batch, status, .. }) => {
            assert_eq!(batch, 1);
            assert_eq!(status, 403);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Uploads happened, but the run did not complete.
    assert_eq!(deployment.documents().len(), 30);
    assert!(deployment.store.object(DEFAULT_MANIFEST_PATH).is_none());
}
