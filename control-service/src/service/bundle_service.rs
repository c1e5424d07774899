//! C6: shared-bundle lifecycle, §4.6. The server never touches bundle
//! bytes — it only mediates the lifecycle row and issues presigned URLs
//! through the injected [`StorageBackend`].

use shared::config::ObjectStoreConfig;
use shared::errors::ApiError;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::domain::SharedBundle;
use crate::repository::BundleRepository;
use crate::storage::{StorageBackend, UploadUrl};

const BUNDLE_KEY_PREFIX: &str = "bundles";

#[derive(Clone)]
pub struct BundleService {
    repo: BundleRepository,
    storage: Arc<dyn StorageBackend>,
    object_store: ObjectStoreConfig,
}

impl BundleService {
    pub fn new(repo: BundleRepository, storage: Arc<dyn StorageBackend>, object_store: ObjectStoreConfig) -> Self {
        Self { repo, storage, object_store }
    }

    /// `GET /sessions/my-sessions`: lazily creates the singleton row.
    pub async fn get_or_create(&self) -> Result<SharedBundle, ApiError> {
        self.repo.get_or_create().await
    }

    /// §4.6 `request-upload`. Does not change bundle state; state advances
    /// only on `complete-upload`.
    pub async fn request_upload(&self, bundle_id: Uuid) -> Result<UploadUrl, ApiError> {
        let key = self.storage.generate_key(BUNDLE_KEY_PREFIX);
        let ttl = Duration::from_secs(self.object_store.upload_url_ttl_seconds);

        let upload_url = self
            .storage
            .create_upload_url(&key, ttl, Some("application/zip"))
            .await?;

        self.repo.begin_upload(bundle_id, &key).await?;
        info!(%bundle_id, key = %key, "bundle upload URL issued");
        Ok(upload_url)
    }

    /// §4.6 `complete-upload`: transitions to ready, bumps the version.
    pub async fn complete_upload(
        &self,
        bundle_id: Uuid,
        checksum: &str,
    ) -> Result<SharedBundle, ApiError> {
        let updated = self.repo.complete_upload(bundle_id, checksum).await?;
        info!(%bundle_id, version = updated.bundle_version, "bundle upload completed");
        Ok(updated)
    }

    /// §4.6 `request-download`: reject unless the bundle is downloadable.
    pub async fn request_download(&self, bundle_id: Uuid) -> Result<crate::storage::DownloadUrl, ApiError> {
        let bundle = self.repo.require().await?;
        if bundle.bundle_id != bundle_id || !bundle.status().is_downloadable() {
            return Err(ApiError::BadRequest {
                message: "bundle is not currently downloadable".to_string(),
            });
        }
        let key = bundle
            .bundle_key
            .as_ref()
            .ok_or_else(|| ApiError::NotFound { resource: "bundle object".to_string() })?;

        // Clamp to the 15-minute cap from §4.6 regardless of configuration drift.
        let ttl_seconds = self.object_store.download_url_ttl_seconds.min(900);
        self.storage.create_download_url(key, Duration::from_secs(ttl_seconds)).await
    }

    /// §4.6 `mark-ready`: operator-root force-transition for out-of-band
    /// uploads. Role enforcement happens at the route layer.
    pub async fn mark_ready(&self, bundle_id: Uuid) -> Result<SharedBundle, ApiError> {
        self.repo.set_status(bundle_id, "ready").await
    }

    pub async fn report_status(&self, bundle_id: Uuid, status: &str) -> Result<SharedBundle, ApiError> {
        self.repo.set_status(bundle_id, status).await
    }

    /// §3's Domain/Proxy annotation catalog: lets an operator-root repoint
    /// the bundle at a different edge domain, e.g. after a `auth_error`
    /// report traced back to a bad hostname.
    pub async fn assign_domain(&self, bundle_id: Uuid, domain_id: Option<Uuid>) -> Result<SharedBundle, ApiError> {
        self.repo.assign_domain(bundle_id, domain_id).await
    }

    /// Same annotation mechanism as [`Self::assign_domain`], for the
    /// forward-proxy catalog entry instead.
    pub async fn assign_proxy(&self, bundle_id: Uuid, proxy_id: Option<Uuid>) -> Result<SharedBundle, ApiError> {
        self.repo.assign_proxy(bundle_id, proxy_id).await
    }
}
