//! # JWT Token Codec
//!
//! Generation and verification of the two bearer tokens minted per session:
//! a short-lived access token and a longer-lived refresh token. Per-kind
//! secrets mean a compromised refresh secret cannot be used to forge an
//! access token, or vice versa.
//!
//! ## Token Structure
//!
//! ```text
//! xxxxx.yyyyy.zzzzz
//! ├────┼─────┼────┤
//! │    │     │    └── Signature (HMAC-SHA256)
//! │    │     └─────── Payload (claims)
//! │    └───────────── Header (algorithm, type)
//! ```
//!
//! ## Claims
//!
//! | Claim | Description |
//! |-------|-------------|
//! | `sub` | Subject (user id) |
//! | `email` | User's email, for display/logging |
//! | `role` | Role tier at mint time |
//! | `iss`/`aud` | Issuer/audience, validated on decode |
//! | `exp`/`iat` | Expiration / issued-at |
//! | `jti` | Unique token id |
//! | `type` | `access` or `refresh` — prevents cross-use |
//!
//! Verification distinguishes three outcomes: **malformed/invalid**
//! signature, **expired**, and (for type confusion) **invalid** again —
//! callers must not conflate "expired" with "invalid" because the client
//! uses the distinction to decide whether to attempt a refresh.

use crate::config::JwtConfig;
use crate::errors::ApiError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Distinguishes access from refresh tokens at the claim level, in
/// addition to the distinct signing secret each kind uses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Minting and verification service. Cheap to clone; keys are immutable
/// after construction. Create once at startup and share via `web::Data`.
#[derive(Clone)]
pub struct JwtService {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding_key = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding_key = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding_key = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding_key = DecodingKey::from_secret(config.refresh_secret.as_bytes());

        Self {
            access_encoding_key,
            access_decoding_key,
            refresh_encoding_key,
            refresh_decoding_key,
            config,
        }
    }

    /// Mints a fresh access+refresh pair. Called by the login pipeline
    /// (step 5) and by refresh (which mints a brand new pair, not a
    /// rotation of the old one).
    pub fn generate_tokens(&self, user_id: Uuid, email: &str, role: &str) -> Result<TokenPair, ApiError> {
        let access_token = self.generate_access_token(user_id, email, role)?;
        let refresh_token = self.generate_refresh_token(user_id, email, role)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_token_ttl_seconds as i64,
            refresh_expires_in: self.config.refresh_token_ttl_seconds as i64,
        })
    }

    pub fn generate_access_token(&self, user_id: Uuid, email: &str, role: &str) -> Result<String, ApiError> {
        let ttl = Duration::seconds(self.config.access_token_ttl_seconds as i64);
        let claims = self.build_claims(user_id, email, role, TokenType::Access, ttl);
        encode(&Header::default(), &claims, &self.access_encoding_key)
            .map_err(|e| ApiError::InternalError { message: format!("failed to mint access token: {e}") })
    }

    pub fn generate_refresh_token(&self, user_id: Uuid, email: &str, role: &str) -> Result<String, ApiError> {
        let ttl = Duration::seconds(self.config.refresh_token_ttl_seconds as i64);
        let claims = self.build_claims(user_id, email, role, TokenType::Refresh, ttl);
        encode(&Header::default(), &claims, &self.refresh_encoding_key)
            .map_err(|e| ApiError::InternalError { message: format!("failed to mint refresh token: {e}") })
    }

    fn build_claims(&self, user_id: Uuid, email: &str, role: &str, token_type: TokenType, ttl: Duration) -> Claims {
        let now = Utc::now();
        Claims {
            sub: user_id,
            email: email.to_string(),
            role: role.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    /// Verifies an access token. Maps expiry to a distinct error so the
    /// client can trigger a refresh rather than a full re-login.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = Self::decode_token(token, &self.access_decoding_key, &self.config)?;
        if claims.token_type != TokenType::Access {
            return Err(ApiError::InvalidToken);
        }
        Ok(claims)
    }

    /// Verifies a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, ApiError> {
        let claims = Self::decode_token(token, &self.refresh_decoding_key, &self.config)?;
        if claims.token_type != TokenType::Refresh {
            return Err(ApiError::InvalidToken);
        }
        Ok(claims)
    }

    fn decode_token(token: &str, key: &DecodingKey, config: &JwtConfig) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        let token_data: TokenData<Claims> = decode(token, key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::TokenExpired,
            _ => ApiError::InvalidToken,
        })?;

        Ok(token_data.claims)
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header.
    pub fn extract_from_header(auth_header: &str) -> Result<&str, ApiError> {
        auth_header.strip_prefix("Bearer ").ok_or(ApiError::InvalidToken)
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access_secret_key_minimum_32_characters".to_string(),
            refresh_secret: "refresh_secret_key_minimum_32_characters_different".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604800,
            issuer: "fleetlock".to_string(),
            audience: "fleetlock-api".to_string(),
        }
    }

    #[test]
    fn mint_then_verify_roundtrips_subject_and_role() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();

        let tokens = service.generate_tokens(user_id, "alice@x", "user").unwrap();
        let claims = service.validate_access_token(&tokens.access_token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, "user");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn access_and_refresh_tokens_use_distinct_secrets() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();
        let tokens = service.generate_tokens(user_id, "alice@x", "user").unwrap();

        // An access token cannot be decoded with the refresh key, and vice versa.
        let as_refresh = service.validate_refresh_token(&tokens.access_token);
        assert!(matches!(as_refresh, Err(ApiError::InvalidToken)));

        let as_access = service.validate_access_token(&tokens.refresh_token);
        assert!(matches!(as_access, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn expired_token_reports_expired_not_invalid() {
        let mut config = test_config();
        config.access_token_ttl_seconds = 0;
        let service = JwtService::new(config);
        let user_id = Uuid::new_v4();

        let token = service.generate_access_token(user_id, "alice@x", "user").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));

        let result = service.validate_access_token(&token);
        assert!(matches!(result, Err(ApiError::TokenExpired)));
    }

    #[test]
    fn extract_from_header_requires_bearer_prefix() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let header = format!("Bearer {token}");
        assert_eq!(JwtService::extract_from_header(&header).unwrap(), token);
        assert!(matches!(
            JwtService::extract_from_header("Basic token"),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn each_minted_token_gets_a_unique_jti() {
        let service = JwtService::new(test_config());
        let user_id = Uuid::new_v4();

        let t1 = service.generate_tokens(user_id, "alice@x", "user").unwrap();
        let t2 = service.generate_tokens(user_id, "alice@x", "user").unwrap();

        let c1 = service.validate_access_token(&t1.access_token).unwrap();
        let c2 = service.validate_access_token(&t2.access_token).unwrap();
        assert_ne!(c1.jti, c2.jti);
    }
}
