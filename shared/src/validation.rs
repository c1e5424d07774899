//! # Request Validation Helpers
//!
//! Utilities for validating incoming request data using the `validator` crate.
//!
//! ## Validation Flow
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ JSON Request │────►│ Deserialize   │────►│   Validate   │
//! │              │     │ (serde)       │     │  (validator) │
//! └──────────────┘     └───────────────┘     └──────┬───────┘
//!                                                   │
//!         ┌─────────────────────────────────────────┴───────┐
//!         ▼                                                 ▼
//! ┌───────────────┐                               ┌─────────────────┐
//! │   Success     │                               │ ValidationError │
//! │ (continue)    │                               │   (400 + details)│
//! └───────────────┘                               └─────────────────┘
//! ```

use crate::errors::ApiError;
use serde::de::DeserializeOwned;
use validator::Validate;

/// Validates a request DTO implementing `Validate`. Use in handlers before
/// touching the validated fields.
pub fn validate_request<T: Validate>(data: &T) -> Result<(), ApiError> {
    data.validate().map_err(ApiError::ValidationError)
}

/// Parses JSON and validates in one step.
pub fn parse_and_validate<T: DeserializeOwned + Validate>(json: &str) -> Result<T, ApiError> {
    let data: T = serde_json::from_str(json)
        .map_err(|e| ApiError::BadRequest { message: e.to_string() })?;
    validate_request(&data)?;
    Ok(data)
}

/// Custom validation functions for `#[validate(custom(function = "..."))]`.
pub mod validators {
    use validator::ValidationError;

    /// String is not empty after trimming.
    pub fn not_blank(value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new("blank"));
        }
        Ok(())
    }

    /// IEEE 802 MAC address, colon- or hyphen-separated (`aa:bb:cc:dd:ee:ff`).
    pub fn valid_mac_address(value: &str) -> Result<(), ValidationError> {
        let normalized = value.replace('-', ":");
        let octets: Vec<&str> = normalized.split(':').collect();
        if octets.len() != 6
            || !octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
        {
            return Err(ValidationError::new("invalid_mac_address"));
        }
        Ok(())
    }

    /// Passwords must meet a minimum entropy floor before they ever reach
    /// the hasher; the hasher's own cost parameter is the second line of
    /// defense, not a substitute for this.
    pub fn strong_password(value: &str) -> Result<(), ValidationError> {
        if value.len() < 10 {
            return Err(ValidationError::new("password_too_short"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validators::*;

    #[test]
    fn not_blank_rejects_whitespace_only() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("").is_err());
        assert!(not_blank("   ").is_err());
    }

    #[test]
    fn mac_address_accepts_colon_and_hyphen_forms() {
        assert!(valid_mac_address("aa:bb:cc:dd:ee:ff").is_ok());
        assert!(valid_mac_address("AA-BB-CC-DD-EE-FF").is_ok());
    }

    #[test]
    fn mac_address_rejects_malformed_input() {
        assert!(valid_mac_address("not-a-mac").is_err());
        assert!(valid_mac_address("aa:bb:cc:dd:ee").is_err());
        assert!(valid_mac_address("zz:bb:cc:dd:ee:ff").is_err());
    }

    #[test]
    fn strong_password_enforces_minimum_length() {
        assert!(strong_password("short").is_err());
        assert!(strong_password("a-reasonable-passphrase").is_ok());
    }
}
