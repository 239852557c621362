//! Byte-level access to upstream URLs.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::error::UpstreamError;

/// User agent sent with every upstream request.
pub const DEFAULT_USER_AGENT: &str = concat!("metasync/", env!("CARGO_PKG_VERSION"));

/// Fetches documents by URL.
///
/// A missing document (HTTP 404) is `Ok(None)`, not an error; callers decide
/// whether absence is fatal.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Body of `url`, or `None` if it does not exist.
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, UpstreamError>;

    /// Size of `url` as reported by the server, without downloading it.
    async fn content_length(&self, url: &str) -> Result<Option<u64>, UpstreamError>;

    /// Body of `url`, treating absence as an error.
    async fn fetch_required(&self, url: &str) -> Result<Bytes, UpstreamError> {
        self.fetch(url)
            .await?
            .ok_or_else(|| UpstreamError::NotFound(url.to_string()))
    }
}

/// Fetch `url` and decode it as JSON.
pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn Fetcher,
    url: &str,
) -> Result<T, UpstreamError> {
    let body = fetcher.fetch_required(url).await?;
    serde_json::from_slice(&body).map_err(|source| UpstreamError::Json {
        url: url.to_string(),
        source,
    })
}

/// [`Fetcher`] over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher sending `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|source| UpstreamError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, UpstreamError> {
        trace!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| http_error(url, source))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(url, "not found");
                Ok(None)
            }
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|source| http_error(url, source))?;
                trace!(url, bytes = body.len(), "response body read");
                Ok(Some(body))
            }
            status => {
                warn!(url, status = status.as_u16(), "HTTP error status");
                Err(UpstreamError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
        }
    }

    async fn content_length(&self, url: &str) -> Result<Option<u64>, UpstreamError> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|source| http_error(url, source))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())),
            status => Err(UpstreamError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

fn http_error(url: &str, source: reqwest::Error) -> UpstreamError {
    warn!(
        url,
        error = %source,
        is_connect = source.is_connect(),
        is_timeout = source.is_timeout(),
        "HTTP request failed"
    );
    UpstreamError::Http {
        url: url.to_string(),
        source,
    }
}

/// [`Fetcher`] serving documents from a map, for tests and offline runs.
#[derive(Default)]
pub struct MemoryFetcher {
    documents: RwLock<HashMap<String, Bytes>>,
    requests: AtomicU64,
}

impl MemoryFetcher {
    /// An empty fetcher: every URL is missing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub fn insert(&self, url: impl Into<String>, body: impl Into<Bytes>) {
        self.documents
            .write()
            .expect("lock poisoned")
            .insert(url.into(), body.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.insert(url, body);
        self
    }

    /// Number of `fetch` and `content_length` calls served.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, UpstreamError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .documents
            .read()
            .expect("lock poisoned")
            .get(url)
            .cloned())
    }

    async fn content_length(&self, url: &str) -> Result<Option<u64>, UpstreamError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .documents
            .read()
            .expect("lock poisoned")
            .get(url)
            .map(|b| b.len() as u64))
    }
}
