//! Batched, rate-limited cache invalidation of changed paths.
//!
//! Batches are submitted strictly one at a time. Each batch consumes as many
//! quota units as it has URLs, and the limiter is consulted before every
//! batch.

use std::sync::Arc;

use tracing::{error, info};

use crate::clock::{Clock, TokioClock};
use crate::error::PurgeError;
use crate::limiter::FixedWindowLimiter;
use crate::purger::Purger;

/// URLs per purge request accepted by the CDN.
pub const DEFAULT_BATCH_SIZE: usize = 30;

/// URLs per minute accepted by the CDN.
pub const DEFAULT_LIMIT_PER_MINUTE: usize = 1000;

/// External bounds on purge traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeLimits {
    /// Maximum URLs per request.
    pub batch_size: usize,
    /// Maximum URLs per one-minute window.
    pub limit_per_minute: usize,
}

impl Default for PurgeLimits {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            limit_per_minute: DEFAULT_LIMIT_PER_MINUTE,
        }
    }
}

impl PurgeLimits {
    /// Reject limits under which a full batch could never be admitted.
    pub fn validate(&self) -> Result<(), PurgeError> {
        if self.batch_size == 0 || self.batch_size > self.limit_per_minute {
            return Err(PurgeError::InvalidLimits {
                batch_size: self.batch_size,
                limit_per_minute: self.limit_per_minute,
            });
        }
        Ok(())
    }
}

/// Counts for one `invalidate` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    /// Requests issued.
    pub batches: usize,
    /// URLs purged.
    pub urls: usize,
    /// Times the limiter made the run wait for a new window.
    pub waits: usize,
}

/// Converts changed paths to public URLs and purges them.
pub struct CacheInvalidator {
    purger: Arc<dyn Purger>,
    clock: Arc<dyn Clock>,
    base_url: String,
    batch_size: usize,
    limiter: FixedWindowLimiter,
}

impl CacheInvalidator {
    /// Create an invalidator publishing under `base_url`.
    pub fn new(
        purger: Arc<dyn Purger>,
        base_url: impl Into<String>,
        limits: PurgeLimits,
    ) -> Result<Self, PurgeError> {
        limits.validate()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            purger,
            clock: Arc::new(TokioClock),
            base_url,
            batch_size: limits.batch_size,
            limiter: FixedWindowLimiter::per_minute(limits.limit_per_minute as u64),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Public URL of a logical path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Purge every path in `paths`, in order.
    ///
    /// Fails on the first batch the CDN does not answer with 200; earlier
    /// batches stay purged.
    pub async fn invalidate(&mut self, paths: &[String]) -> Result<PurgeReport, PurgeError> {
        let mut report = PurgeReport::default();
        if paths.is_empty() {
            info!("nothing to purge");
            return Ok(report);
        }

        let urls: Vec<String> = paths.iter().map(|p| self.url_for(p)).collect();
        let limit = self.limiter.limit() as usize;
        info!(
            urls = urls.len(),
            batches = urls.len().div_ceil(self.batch_size),
            eta_mins = urls.len() / limit,
            "purging cache"
        );

        for (index, batch) in urls.chunks(self.batch_size).enumerate() {
            let number = index + 1;
            report.waits += self
                .limiter
                .acquire(batch.len() as u64, self.clock.as_ref())
                .await;

            let response = self.purger.purge(batch).await?;
            if !response.is_ok() {
                error!(
                    batch = number,
                    status = response.status,
                    body = %response.body,
                    "purge rejected"
                );
                return Err(PurgeError::Rejected {
                    batch: number,
                    status: response.status,
                    body: response.body,
                });
            }

            report.batches += 1;
            report.urls += batch.len();
        }

        info!(
            batches = report.batches,
            urls = report.urls,
            waits = report.waits,
            "cache purged"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::purger::RecordingPurger;
    use tokio::time::Duration;

    fn paths(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("v3/versions/loader/{i}")).collect()
    }

    fn invalidator(
        purger: Arc<RecordingPurger>,
        clock: Arc<ManualClock>,
        limits: PurgeLimits,
    ) -> CacheInvalidator {
        CacheInvalidator::new(purger, "https://meta.example/", limits)
            .unwrap()
            .with_clock(clock)
    }

    #[tokio::test]
    async fn test_3000_urls_make_100_batches_with_waits() {
        let purger = Arc::new(RecordingPurger::new());
        let clock = Arc::new(ManualClock::new());
        let mut inv = invalidator(purger.clone(), clock.clone(), PurgeLimits::default());

        let report = inv.invalidate(&paths(3000)).await.unwrap();

        assert_eq!(report.batches, 100);
        assert_eq!(report.urls, 3000);
        assert_eq!(purger.batches().len(), 100);
        assert!(purger.batches().iter().all(|b| b.len() == 30));
        // 33 batches (990 urls) fit in each window.
        assert_eq!(report.waits, 3);
        assert_eq!(clock.sleeps().len(), 3);
        assert!(clock.sleeps().iter().all(|d| *d == Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_no_wait_when_quota_not_exceeded_within_window() {
        let purger = Arc::new(RecordingPurger::new());
        let clock = Arc::new(ManualClock::new());
        let mut inv = invalidator(purger.clone(), clock.clone(), PurgeLimits::default());

        let report = inv.invalidate(&paths(990)).await.unwrap();
        assert_eq!(report.batches, 33);
        assert_eq!(report.waits, 0);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_batch() {
        let purger = Arc::new(RecordingPurger::new());
        let clock = Arc::new(ManualClock::new());
        let mut inv = invalidator(purger.clone(), clock, PurgeLimits::default());

        inv.invalidate(&paths(60)).await.unwrap();
        assert_eq!(purger.batches().len(), 2);

        let purger = Arc::new(RecordingPurger::new());
        let mut inv = invalidator(
            purger.clone(),
            Arc::new(ManualClock::new()),
            PurgeLimits::default(),
        );
        inv.invalidate(&paths(61)).await.unwrap();
        let batches = purger.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].len(), 1);
    }

    #[tokio::test]
    async fn test_urls_are_prefixed_with_base_url() {
        let purger = Arc::new(RecordingPurger::new());
        let mut inv = CacheInvalidator::new(
            purger.clone(),
            "https://meta.example",
            PurgeLimits::default(),
        )
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()));

        inv.invalidate(&["v3/versions".to_string(), "/index.html".to_string()])
            .await
            .unwrap();
        assert_eq!(
            purger.urls(),
            vec![
                "https://meta.example/v3/versions",
                "https://meta.example/index.html"
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_surfaces_batch_and_body() {
        let purger = Arc::new(RecordingPurger::failing_at(3, 429));
        let mut inv = invalidator(
            purger.clone(),
            Arc::new(ManualClock::new()),
            PurgeLimits::default(),
        );

        let err = inv.invalidate(&paths(200)).await.unwrap_err();
        match err {
            PurgeError::Rejected {
                batch,
                status,
                body,
            } => {
                assert_eq!(batch, 3);
                assert_eq!(status, 429);
                assert!(body.contains("\"batch\":3"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Later batches were never sent.
        assert_eq!(purger.batches().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_input_issues_nothing() {
        let purger = Arc::new(RecordingPurger::new());
        let mut inv = invalidator(
            purger.clone(),
            Arc::new(ManualClock::new()),
            PurgeLimits::default(),
        );
        assert_eq!(inv.invalidate(&[]).await.unwrap(), PurgeReport::default());
        assert!(purger.batches().is_empty());
    }

    #[test]
    fn test_invalid_limits_rejected() {
        let purger: Arc<dyn Purger> = Arc::new(RecordingPurger::new());
        for limits in [
            PurgeLimits {
                batch_size: 0,
                limit_per_minute: 10,
            },
            PurgeLimits {
                batch_size: 50,
                limit_per_minute: 10,
            },
        ] {
            assert!(matches!(
                CacheInvalidator::new(purger.clone(), "https://x/", limits),
                Err(PurgeError::InvalidLimits { .. })
            ));
        }
    }
}
