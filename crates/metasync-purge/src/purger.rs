//! The CDN bulk-invalidation collaborator.

use std::sync::Mutex;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::PurgeError;

/// Base of the Cloudflare v4 API.
pub const CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Raw answer to one purge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl PurgeResponse {
    /// Whether the CDN accepted the batch.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Submits one batch of fully-qualified URLs for invalidation.
///
/// Transport failures are errors; a delivered response is returned as-is and
/// judged by the caller.
#[async_trait::async_trait]
pub trait Purger: Send + Sync {
    /// Purge `urls` from the CDN cache.
    async fn purge(&self, urls: &[String]) -> Result<PurgeResponse, PurgeError>;
}

#[derive(Serialize)]
struct PurgeFilesRequest<'a> {
    files: &'a [String],
}

/// Cloudflare `purge_cache` by file URL.
pub struct CloudflarePurger {
    client: Client,
    endpoint: String,
    api_token: String,
}

impl CloudflarePurger {
    /// Purger for `zone_id` on the public API.
    pub fn new(zone_id: &str, api_token: impl Into<String>) -> Result<Self, PurgeError> {
        if zone_id.is_empty() || zone_id.contains('/') {
            return Err(PurgeError::InvalidEndpoint(format!("zone id {zone_id:?}")));
        }
        Self::with_endpoint(
            format!("{CLOUDFLARE_API_URL}/zones/{zone_id}/purge_cache"),
            api_token,
        )
    }

    /// Purger posting to an explicit endpoint.
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Result<Self, PurgeError> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.into(),
            api_token: api_token.into(),
        })
    }

    /// The URL batches are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl Purger for CloudflarePurger {
    async fn purge(&self, urls: &[String]) -> Result<PurgeResponse, PurgeError> {
        debug!(count = urls.len(), endpoint = %self.endpoint, "posting purge batch");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .header("Accept", "application/json")
            .json(&PurgeFilesRequest { files: urls })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(PurgeResponse { status, body })
    }
}

/// A purger that records every batch and answers with a fixed status.
///
/// Used for tests and for wiring the pipeline without a CDN.
pub struct RecordingPurger {
    batches: Mutex<Vec<Vec<String>>>,
    fail_batch: Option<(usize, u16)>,
}

impl RecordingPurger {
    /// A purger that accepts every batch.
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_batch: None,
        }
    }

    /// Answer the `batch`-th call (1-based) with `status`.
    pub fn failing_at(batch: usize, status: u16) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_batch: Some((batch, status)),
        }
    }

    /// Every batch received, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().expect("lock poisoned").clone()
    }

    /// All URLs received, flattened.
    pub fn urls(&self) -> Vec<String> {
        self.batches().into_iter().flatten().collect()
    }
}

impl Default for RecordingPurger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Purger for RecordingPurger {
    async fn purge(&self, urls: &[String]) -> Result<PurgeResponse, PurgeError> {
        let mut batches = self.batches.lock().expect("lock poisoned");
        batches.push(urls.to_vec());
        match self.fail_batch {
            Some((n, status)) if n == batches.len() => Ok(PurgeResponse {
                status,
                body: format!("{{\"success\":false,\"batch\":{n}}}"),
            }),
            _ => Ok(PurgeResponse {
                status: 200,
                body: "{\"success\":true}".to_string(),
            }),
        }
    }
}
