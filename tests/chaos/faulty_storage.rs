//! Uploads through a slow, randomly failing bucket.

use std::sync::Arc;

use metasync_builder::FixedArtifacts;
use metasync_engine::{PublishError, PublishOptions};
use metasync_store::FaultyStore;
use metasync_types::{Artifact, ContentHash};
use metasync_tests::Deployment;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn artifacts(count: usize, generation: u32) -> Vec<Artifact> {
    (0..count)
        .map(|i| Artifact::json(format!("v3/doc/{i:04}"), format!("{{\"g\":{generation}}}")))
        .collect()
}

#[tokio::test]
async fn upload_pool_stays_bounded_under_latency() {
    let deployment = Deployment::new();
    let faulty = Arc::new(
        FaultyStore::new(deployment.store.clone())
            .write_latency(1, 5)
            .seed(7),
    );
    let provider = Arc::new(FixedArtifacts::new(artifacts(200, 0)));
    let options = PublishOptions {
        upload_concurrency: 8,
        ..PublishOptions::default()
    };

    let summary = deployment
        .publisher_on(faulty.clone(), provider, options)
        .publish()
        .await
        .unwrap();

    assert_eq!(summary.sync.uploaded, 200);
    assert!(faulty.peak_in_flight() <= 8, "peak {}", faulty.peak_in_flight());
    assert!(faulty.peak_in_flight() > 1);
    assert_eq!(deployment.manifest().await.len(), 200);
}

#[tokio::test]
async fn random_upload_failures_never_advance_the_baseline() {
    let deployment = Deployment::new();
    let provider = Arc::new(FixedArtifacts::new(artifacts(50, 0)));
    deployment
        .publisher(provider.clone(), PublishOptions::default())
        .publish()
        .await
        .unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    for generation in 1..=5 {
        let baseline = deployment.manifest().await;
        let victim = format!("v3/doc/{:04}", rng.random_range(0..50));
        provider.replace(artifacts(50, generation));

        let faulty = Arc::new(
            FaultyStore::new(deployment.store.clone())
                .write_latency(0, 2)
                .seed(generation as u64)
                .fail_put(victim.clone()),
        );
        let err = deployment
            .publisher_on(faulty, provider.clone(), PublishOptions::default())
            .publish()
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Sync(_)), "{victim}: {err}");
        assert_eq!(deployment.manifest().await, baseline);

        let summary = deployment
            .publisher(provider.clone(), PublishOptions::default())
            .publish()
            .await
            .unwrap();
        assert_eq!(summary.changed.len(), 50);

        let manifest = deployment.manifest().await;
        let expected = ContentHash::of(format!("{{\"g\":{generation}}}").as_bytes());
        assert!(manifest.iter().all(|(_, hash)| *hash == expected));
    }
}
