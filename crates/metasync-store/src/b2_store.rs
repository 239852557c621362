//! Backblaze B2 backend over the native JSON API.
//!
//! The store authorizes once, resolves the bucket id, and keeps a pool of
//! upload URLs: B2 hands out one upload URL per concurrent uploader, so an
//! upload task borrows a URL for the duration of its request and returns it
//! afterwards. Transient failures (timeouts, 401 on an upload token, 408,
//! 429, 5xx) are retried a bounded number of times with a fresh upload URL.

use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::traits::ObjectStore;

/// Default account authorization endpoint.
pub const B2_AUTHORIZE_URL: &str = "https://api.backblazeb2.com/b2api/v2/b2_authorize_account";

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Application key credentials.
#[derive(Clone)]
pub struct B2Credentials {
    /// Application key id.
    pub key_id: String,
    /// Application key secret.
    pub application_key: String,
}

impl std::fmt::Debug for B2Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("B2Credentials")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizeResponse {
    account_id: String,
    authorization_token: String,
    api_url: String,
    download_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListBucketsResponse {
    buckets: Vec<BucketInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BucketInfo {
    bucket_id: String,
    bucket_name: String,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadTarget {
    upload_url: String,
    authorization_token: String,
}

/// Object store backed by a single B2 bucket.
pub struct B2Store {
    client: Client,
    api_url: String,
    download_url: String,
    token: String,
    bucket_name: String,
    bucket_id: String,
    upload_targets: Mutex<Vec<UploadTarget>>,
}

impl B2Store {
    /// Authorize against B2 and bind to `bucket`.
    pub async fn connect(
        credentials: &B2Credentials,
        bucket: &str,
        user_agent: &str,
    ) -> Result<Self, StoreError> {
        Self::connect_with(B2_AUTHORIZE_URL, credentials, bucket, user_agent).await
    }

    /// Like [`connect`](Self::connect) with an explicit authorization endpoint.
    pub async fn connect_with(
        authorize_url: &str,
        credentials: &B2Credentials,
        bucket: &str,
        user_agent: &str,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent(user_agent).build()?;

        let response = client
            .get(authorize_url)
            .basic_auth(&credentials.key_id, Some(&credentials.application_key))
            .send()
            .await?;
        let auth: AuthorizeResponse =
            decode(check(response, "authorize", "b2_authorize_account").await?).await?;

        let response = client
            .post(format!("{}/b2api/v2/b2_list_buckets", auth.api_url))
            .header("Authorization", &auth.authorization_token)
            .json(&json!({ "accountId": auth.account_id, "bucketName": bucket }))
            .send()
            .await?;
        let listed: ListBucketsResponse =
            decode(check(response, "list buckets", "b2_list_buckets").await?).await?;

        let bucket_id = listed
            .buckets
            .into_iter()
            .find(|b| b.bucket_name == bucket)
            .map(|b| b.bucket_id)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;

        debug!(bucket, %bucket_id, "connected to b2 bucket");

        Ok(Self {
            client,
            api_url: auth.api_url,
            download_url: auth.download_url,
            token: auth.authorization_token,
            bucket_name: bucket.to_string(),
            bucket_id,
            upload_targets: Mutex::new(Vec::new()),
        })
    }

    /// Name of the bound bucket.
    pub fn bucket(&self) -> &str {
        &self.bucket_name
    }

    /// Download URL of a file by name: `{download}/file/{bucket}/{path...}`.
    fn file_url(&self, path: &str) -> Result<url::Url, StoreError> {
        let mut url = url::Url::parse(&self.download_url)
            .map_err(|_| StoreError::InvalidPath(self.download_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidPath(self.download_url.clone()))?
            .pop_if_empty()
            .push("file")
            .push(&self.bucket_name)
            .extend(path.split('/'));
        Ok(url)
    }

    async fn borrow_upload_target(&self) -> Result<UploadTarget, StoreError> {
        if let Some(target) = self.upload_targets.lock().expect("lock poisoned").pop() {
            return Ok(target);
        }
        let response = self
            .client
            .post(format!("{}/b2api/v2/b2_get_upload_url", self.api_url))
            .header("Authorization", &self.token)
            .json(&json!({ "bucketId": self.bucket_id }))
            .send()
            .await?;
        decode(check(response, "get upload url", "b2_get_upload_url").await?).await
    }

    fn return_upload_target(&self, target: UploadTarget) {
        self.upload_targets
            .lock()
            .expect("lock poisoned")
            .push(target);
    }

    async fn upload_once(
        &self,
        path: &str,
        data: &Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let target = self.borrow_upload_target().await?;
        let encoded_name: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();

        let response = self
            .client
            .post(&target.upload_url)
            .header("Authorization", &target.authorization_token)
            .header("X-Bz-File-Name", encoded_name)
            .header("Content-Type", content_type)
            .header("X-Bz-Content-Sha1", "do_not_verify")
            .body(data.clone())
            .send()
            .await?;

        // A failed upload URL must not be reused.
        check(response, "upload", path).await?;
        self.return_upload_target(target);
        Ok(())
    }

    /// Resolve the id of the latest version of `path`, if it exists.
    async fn file_id(&self, path: &str) -> Result<Option<String>, StoreError> {
        let response = self
            .client
            .head(self.file_url(path)?)
            .header("Authorization", &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response, "head", path).await?;
        Ok(response
            .headers()
            .get("x-bz-file-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    async fn delete_once(&self, path: &str) -> Result<(), StoreError> {
        let Some(file_id) = self.file_id(path).await? else {
            warn!(path, "object already absent, nothing to delete");
            return Ok(());
        };
        let response = self
            .client
            .post(format!("{}/b2api/v2/b2_delete_file_version", self.api_url))
            .header("Authorization", &self.token)
            .json(&json!({ "fileName": path, "fileId": file_id }))
            .send()
            .await?;
        check(response, "delete", path).await?;
        Ok(())
    }

    async fn get_once(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        let response = self
            .client
            .get(self.file_url(path)?)
            .header("Authorization", &self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response, "download", path).await?.bytes().await?))
    }
}

/// Run `op` up to [`MAX_ATTEMPTS`] times while it fails transiently.
async fn with_retry<T, F, Fut>(
    operation: &'static str,
    path: &str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < MAX_ATTEMPTS => {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                warn!(
                    operation,
                    path,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "retrying b2 request"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Turn a non-success response into [`StoreError::Backend`].
async fn check(
    response: Response,
    operation: &'static str,
    path: &str,
) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Backend {
        operation,
        path: path.to_string(),
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait::async_trait]
impl ObjectStore for B2Store {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StoreError> {
        with_retry("upload", path, || self.upload_once(path, &data, content_type)).await?;
        debug!(path, size = data.len(), "uploaded object to b2");
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Bytes>, StoreError> {
        with_retry("download", path, || self.get_once(path)).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        with_retry("delete", path, || self.delete_once(path)).await?;
        debug!(path, "deleted object from b2");
        Ok(())
    }
}
