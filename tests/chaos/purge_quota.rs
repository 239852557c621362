//! Large change sets against the CDN's per-minute quota.

use std::sync::Arc;
use std::time::Duration;

use metasync_builder::FixedArtifacts;
use metasync_engine::PublishOptions;
use metasync_types::Artifact;
use metasync_tests::{BASE_URL, Deployment};

fn artifacts(count: usize, body: &str) -> Vec<Artifact> {
    (0..count)
        .map(|i| Artifact::json(format!("v3/doc/{i:05}"), body.to_string()))
        .collect()
}

#[tokio::test]
async fn three_thousand_changes_wait_out_the_quota() {
    let deployment = Deployment::new();
    let provider = Arc::new(FixedArtifacts::new(artifacts(3000, "1")));

    let summary = deployment
        .publisher(provider, PublishOptions::default())
        .publish()
        .await
        .unwrap();

    let purge = summary.purge.unwrap();
    assert_eq!(purge.batches, 100);
    assert_eq!(purge.urls, 3000);
    assert_eq!(purge.waits, 3);
    assert_eq!(
        deployment.clock.sleeps(),
        vec![Duration::from_secs(60); 3]
    );

    let batches = deployment.purger.batches();
    assert_eq!(batches.len(), 100);
    assert!(batches.iter().all(|b| b.len() == 30));
    assert_eq!(batches[0][0], format!("{BASE_URL}v3/doc/00000"));
    assert_eq!(batches[99][29], format!("{BASE_URL}v3/doc/02999"));
}

#[tokio::test]
async fn only_changed_paths_count_against_the_quota() {
    let deployment = Deployment::new();
    let provider = Arc::new(FixedArtifacts::new(artifacts(900, "1")));
    deployment
        .publisher(provider.clone(), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    // The first 20 documents change, the last 20 disappear.
    let next = (0..880)
        .map(|i| Artifact::json(format!("v3/doc/{i:05}"), if i < 20 { "2" } else { "1" }))
        .collect();
    provider.replace(next);

    let summary = deployment
        .publisher(provider, PublishOptions::default())
        .publish()
        .await
        .unwrap();

    assert_eq!(summary.changed.len(), 20);
    assert_eq!(summary.stale.len(), 20);
    let purge = summary.purge.unwrap();
    assert_eq!(purge.batches, 1);
    assert_eq!(purge.waits, 0);
    assert!(deployment.clock.sleeps().is_empty());
}
