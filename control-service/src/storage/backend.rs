//! Presigned-URL contract for the object store holding the shared bundle,
//! §4.6/§6. The server never proxies bytes; it only signs short-lived URLs
//! the client and operator use to talk to the object store directly.

use async_trait::async_trait;
use shared::errors::ApiError;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct UploadUrl {
    pub url: String,
    pub key: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct DownloadUrl {
    pub url: String,
    pub key: String,
    pub expires_in_seconds: u64,
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Issues a presigned PUT URL for `key`. Failure is reported as
    /// `ApiError::ObjectStoreError` (502) per §4.6's failure model.
    async fn create_upload_url(
        &self,
        key: &str,
        ttl: Duration,
        content_type: Option<&str>,
    ) -> Result<UploadUrl, ApiError>;

    /// Issues a presigned GET URL for `key`.
    async fn create_download_url(&self, key: &str, ttl: Duration) -> Result<DownloadUrl, ApiError>;

    /// Generates a fresh, opaque object key scoped under `prefix`, unique
    /// per upload so concurrent operators never collide (§4.6 concurrency
    /// note).
    fn generate_key(&self, prefix: &str) -> String;
}
