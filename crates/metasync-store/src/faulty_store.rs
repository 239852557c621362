//! An [`ObjectStore`] wrapper that injects latency and failures.
//!
//! `FaultyStore` wraps any `Arc<dyn ObjectStore>`, sleeps for a random
//! duration before each write, fails writes for configured paths, and records
//! the peak number of concurrently in-flight writes. The RNG is seeded for
//! reproducible behaviour across test runs.
//!
//! # Example
//!
//! ```ignore
//! let faulty = FaultyStore::new(inner)
//!     .write_latency(5, 20)         // 5–20 ms per put/delete
//!     .fail_put("v3/versions/game")
//!     .seed(42);
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// An [`ObjectStore`] wrapper for failure-path and concurrency tests.
pub struct FaultyStore {
    inner: Arc<dyn ObjectStore>,
    write_latency_ms: (u64, u64),
    failing_puts: HashSet<String>,
    failing_deletes: HashSet<String>,
    fail_all_gets: bool,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    rng: Mutex<StdRng>,
}

impl FaultyStore {
    /// Wrap an existing store with no latency and no failures.
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            write_latency_ms: (0, 0),
            failing_puts: HashSet::new(),
            failing_deletes: HashSet::new(),
            fail_all_gets: false,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        }
    }

    /// Set the write latency range in milliseconds (uniform random).
    pub fn write_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.write_latency_ms = (min_ms, max_ms);
        self
    }

    /// Make every `put` of `path` fail.
    pub fn fail_put(mut self, path: impl Into<String>) -> Self {
        self.failing_puts.insert(path.into());
        self
    }

    /// Make every `delete` of `path` fail.
    pub fn fail_delete(mut self, path: impl Into<String>) -> Self {
        self.failing_deletes.insert(path.into());
        self
    }

    /// Make every `get` fail.
    pub fn fail_gets(mut self) -> Self {
        self.fail_all_gets = true;
        self
    }

    /// Set the RNG seed for deterministic behaviour.
    pub fn seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Highest number of writes that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Sleep for a random duration in `[min, max]` milliseconds.
    async fn delay(&self) {
        let (min, max) = self.write_latency_ms;

        if max == 0 {
            return;
        }

        let ms = if min == max {
            min
        } else {
            self.rng.lock().expect("lock poisoned").random_range(min..=max)
        };

        if ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
        }
    }

    /// Track one in-flight write around `fut`.
    async fn tracked<T>(&self, fut: impl Future<Output = T>) -> T {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        self.delay().await;
        let out = fut.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

#[async_trait::async_trait]
impl ObjectStore for FaultyStore {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        self.tracked(async {
            if self.failing_puts.contains(path) {
                return Err(StoreError::Injected(path.to_string()));
            }
            self.inner.put(path, data, content_type).await
        })
        .await
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        if self.fail_all_gets {
            return Err(StoreError::Injected(path.to_string()));
        }
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.tracked(async {
            if self.failing_deletes.contains(path) {
                return Err(StoreError::Injected(path.to_string()));
            }
            self.inner.delete(path).await
        })
        .await
    }
}
