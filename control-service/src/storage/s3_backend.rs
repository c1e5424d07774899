//! Real S3-compatible presigned-URL issuance, replacing the teacher's
//! local-disk fake-token scheme (`content-service/src/storage/local.rs`)
//! with genuine `aws-sdk-s3` presigning against any S3-compatible endpoint.

use async_trait::async_trait;
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use shared::config::ObjectStoreConfig;
use shared::errors::ApiError;
use std::time::Duration;
use uuid::Uuid;

use super::backend::{DownloadUrl, StorageBackend, UploadUrl};

#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    pub fn new(config: &ObjectStoreConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "fleetlock-object-store",
        );
        let credentials_provider = SharedCredentialsProvider::new(credentials);

        let s3_config = aws_sdk_s3::Config::builder()
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials_provider)
            .force_path_style(true)
            .behavior_version_latest()
            .build();

        Self { client: Client::from_conf(s3_config), bucket: config.bucket.clone() }
    }

    fn presign_error(e: impl std::fmt::Display) -> ApiError {
        ApiError::ObjectStoreError { message: e.to_string() }
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    async fn create_upload_url(
        &self,
        key: &str,
        ttl: Duration,
        content_type: Option<&str>,
    ) -> Result<UploadUrl, ApiError> {
        let presign_config = PresigningConfig::expires_in(ttl).map_err(Self::presign_error)?;

        let mut request = self.client.put_object().bucket(&self.bucket).key(key);
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }

        let presigned = request.presigned(presign_config).await.map_err(Self::presign_error)?;

        Ok(UploadUrl {
            url: presigned.uri().to_string(),
            key: key.to_string(),
            expires_in_seconds: ttl.as_secs(),
        })
    }

    async fn create_download_url(&self, key: &str, ttl: Duration) -> Result<DownloadUrl, ApiError> {
        let presign_config = PresigningConfig::expires_in(ttl).map_err(Self::presign_error)?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(Self::presign_error)?;

        Ok(DownloadUrl {
            url: presigned.uri().to_string(),
            key: key.to_string(),
            expires_in_seconds: ttl.as_secs(),
        })
    }

    fn generate_key(&self, prefix: &str) -> String {
        format!("{prefix}/{}-{}", chrono::Utc::now().timestamp(), Uuid::new_v4())
    }
}
