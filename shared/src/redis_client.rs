//! # Redis Client
//!
//! High-level Redis client for geolocation-result caching and brute-force
//! counters. Single-session enforcement itself lives entirely in Postgres
//! (`User.currentSessionToken`) — Redis here is a best-effort accelerator,
//! never the source of truth.
//!
//! ## Connection Management
//!
//! Uses a `ConnectionManager`, which reconnects automatically. Safe to
//! clone and share across tasks; cloning is an `Arc` clone.
//!
//! ## Key Naming Convention
//!
//! | Pattern | Example | Purpose |
//! |---------|---------|---------|
//! | `geo:ip:{ip}` | `geo:ip:1.2.3.4` | Cached geolocation lookup result |
//! | `failed_login:{email}` | `failed_login:user@example.com` | Brute-force window |
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use shared::redis_client::RedisClient;
//!
//! let redis = RedisClient::new(&config.redis).await?;
//! let count = redis.increment_failed_login("alice@x").await?;
//! ```

use crate::config::RedisConfig;
use crate::errors::ApiError;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

/// Async Redis client with automatic reconnection. `Clone + Send + Sync`.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    pub async fn new(config: &RedisConfig) -> Result<Self, ApiError> {
        info!(url = %config.url, "Connecting to Redis");

        let client = redis::Client::open(config.url.as_str()).map_err(ApiError::RedisError)?;
        let conn = ConnectionManager::new(client).await.map_err(ApiError::RedisError)?;

        info!("Redis connection established");
        Ok(Self { conn })
    }

    /// Stores a JSON-serialized value with optional TTL.
    pub async fn set<T: serde::Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), ApiError> {
        let serialized = serde_json::to_string(value)
            .map_err(|e| ApiError::InternalError { message: e.to_string() })?;

        let mut conn = self.conn.clone();
        match ttl {
            Some(duration) => {
                conn.set_ex::<_, _, ()>(key, &serialized, duration.as_secs())
                    .await
                    .map_err(ApiError::RedisError)?;
            }
            None => {
                conn.set::<_, _, ()>(key, &serialized).await.map_err(ApiError::RedisError)?;
            }
        }
        Ok(())
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(ApiError::RedisError)?;
        match value {
            Some(s) => {
                let deserialized = serde_json::from_str(&s)
                    .map_err(|e| ApiError::InternalError { message: e.to_string() })?;
                Ok(Some(deserialized))
            }
            None => Ok(None),
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await.map_err(ApiError::RedisError)?;
        Ok(deleted > 0)
    }

    pub async fn incr(&self, key: &str) -> Result<i64, ApiError> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1).await.map_err(ApiError::RedisError)
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, ApiError> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl.as_secs() as i64).await.map_err(ApiError::RedisError)
    }

    /// Health check used by `/healthz`.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(ApiError::RedisError)?;
        Ok(())
    }

    // ---- Geolocation cache (C3) ---------------------------------------
    //
    // The geolocation provider is best-effort and rate-limited; caching
    // a resolved result for an IP avoids re-querying it on every login
    // from the same egress address.

    pub async fn cache_geolocation<T: serde::Serialize>(
        &self,
        ip: &str,
        location: &T,
        ttl: Duration,
    ) -> Result<(), ApiError> {
        self.set(&format!("geo:ip:{ip}"), location, Some(ttl)).await
    }

    pub async fn get_cached_geolocation<T: serde::de::DeserializeOwned>(
        &self,
        ip: &str,
    ) -> Result<Option<T>, ApiError> {
        self.get(&format!("geo:ip:{ip}")).await
    }

    // ---- Brute-force window (C5 step 2 / C8) --------------------------
    //
    // Escalating alert severity (MEDIUM below 5 attempts, HIGH at or
    // above) is keyed off this trailing window, reset on success.

    /// Increments the failed-login counter for an identifier (email).
    /// The counter expires after 15 minutes with no further attempts.
    pub async fn increment_failed_login(&self, identifier: &str) -> Result<i64, ApiError> {
        let key = format!("failed_login:{identifier}");
        let count = self.incr(&key).await?;
        if count == 1 {
            self.expire(&key, Duration::from_secs(15 * 60)).await?;
        }
        Ok(count)
    }

    pub async fn get_failed_login_count(&self, identifier: &str) -> Result<i64, ApiError> {
        let key = format!("failed_login:{identifier}");
        let mut conn = self.conn.clone();
        let count: i64 = conn.get(&key).await.unwrap_or(0);
        Ok(count)
    }

    pub async fn reset_failed_login(&self, identifier: &str) -> Result<(), ApiError> {
        self.delete(&format!("failed_login:{identifier}")).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisClient").finish_non_exhaustive()
    }
}
