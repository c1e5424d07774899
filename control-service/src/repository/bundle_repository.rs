//! C6 shared-bundle store, §4.6. There is at most one `SharedBundle` row;
//! it is created lazily on first read rather than at boot, so a fresh
//! deployment can come up before any operator has configured a bundle.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::SharedBundle;

fn db_err(e: sqlx::Error) -> ApiError {
    ApiError::DatabaseError(e)
}

#[derive(Clone)]
pub struct BundleRepository {
    pool: PgPool,
}

impl BundleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find(&self) -> Result<Option<SharedBundle>, ApiError> {
        sqlx::query_as::<_, SharedBundle>("SELECT * FROM shared_bundles ORDER BY created_at LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    /// Returns the singleton row, creating it in `pending` state if this is
    /// the first call since deployment.
    pub async fn get_or_create(&self) -> Result<SharedBundle, ApiError> {
        if let Some(bundle) = self.find().await? {
            return Ok(bundle);
        }

        let inserted = sqlx::query_as::<_, SharedBundle>(
            r#"
            INSERT INTO shared_bundles (bundle_id, name, status, bundle_version)
            VALUES ($1, 'default', 'pending', 1)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match inserted {
            Some(bundle) => Ok(bundle),
            // Lost the race to create the row; the winner's insert is visible now.
            None => self.require().await,
        }
    }

    pub async fn require(&self) -> Result<SharedBundle, ApiError> {
        self.find().await?.ok_or_else(|| ApiError::NotFound {
            resource: "shared bundle".to_string(),
        })
    }

    /// §4.6 `request-upload`: transitions into `uploading` and stamps the
    /// object key the presigned URL was issued for.
    pub async fn begin_upload(&self, bundle_id: Uuid, bundle_key: &str) -> Result<SharedBundle, ApiError> {
        sqlx::query_as::<_, SharedBundle>(
            r#"
            UPDATE shared_bundles
            SET status = 'uploading', bundle_key = $1, updated_at = now()
            WHERE bundle_id = $2
            RETURNING *
            "#,
        )
        .bind(bundle_key)
        .bind(bundle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    /// §4.6 `complete-upload`: marks the bundle ready, bumps its version,
    /// and records the checksum the client computed.
    pub async fn complete_upload(
        &self,
        bundle_id: Uuid,
        checksum: &str,
    ) -> Result<SharedBundle, ApiError> {
        sqlx::query_as::<_, SharedBundle>(
            r#"
            UPDATE shared_bundles
            SET status = 'ready',
                checksum = $1,
                bundle_version = bundle_version + 1,
                last_synced_at = now(),
                updated_at = now()
            WHERE bundle_id = $2
            RETURNING *
            "#,
        )
        .bind(checksum)
        .bind(bundle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn set_status(&self, bundle_id: Uuid, status: &str) -> Result<SharedBundle, ApiError> {
        sqlx::query_as::<_, SharedBundle>(
            "UPDATE shared_bundles SET status = $1, updated_at = now() WHERE bundle_id = $2 RETURNING *",
        )
        .bind(status)
        .bind(bundle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn assign_domain(
        &self,
        bundle_id: Uuid,
        domain_id: Option<Uuid>,
    ) -> Result<SharedBundle, ApiError> {
        sqlx::query_as::<_, SharedBundle>(
            "UPDATE shared_bundles SET domain_id = $1, updated_at = now() WHERE bundle_id = $2 RETURNING *",
        )
        .bind(domain_id)
        .bind(bundle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    pub async fn assign_proxy(
        &self,
        bundle_id: Uuid,
        proxy_id: Option<Uuid>,
    ) -> Result<SharedBundle, ApiError> {
        sqlx::query_as::<_, SharedBundle>(
            "UPDATE shared_bundles SET proxy_id = $1, updated_at = now() WHERE bundle_id = $2 RETURNING *",
        )
        .bind(proxy_id)
        .bind(bundle_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
