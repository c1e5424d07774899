//! C3: IP geolocation (cached, best-effort) and User-Agent parsing.
//!
//! No crate in the example pack does IP geolocation or UA parsing, so this
//! module is hand-written. It follows the rest of the service layer's shape:
//! a small struct wrapping injected clients (`reqwest::Client`, `RedisClient`)
//! constructed once in `main.rs` and shared via `web::Data`.

use serde::{Deserialize, Serialize};
use shared::config::GeolocationConfig;
use shared::redis_client::RedisClient;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub pretty: String,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    city: Option<String>,
    country_name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

impl DeviceType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Unknown => "unknown",
        }
    }
}

/// Parsed User-Agent, §4.3. `fingerprint()` is the comparison key used to
/// detect "new device" logins.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub device_type: DeviceType,
}

impl DeviceInfo {
    pub fn fingerprint(&self) -> String {
        let os_part = match (&self.os, &self.os_version) {
            (Some(os), Some(v)) => format!("{os} {v}"),
            (Some(os), None) => os.clone(),
            (None, _) => "unknown".to_string(),
        };
        let browser_part = match (&self.browser, &self.browser_version) {
            (Some(b), Some(v)) => format!("{b} {v}"),
            (Some(b), None) => b.clone(),
            (None, _) => "unknown".to_string(),
        };
        format!("{os_part} - {browser_part} - {}", self.device_type.as_str())
    }

    /// Two fingerprints are the "same device" if OS, browser, and
    /// device-type all match; unset fields are wildcards.
    pub fn same_device(&self, other: &DeviceInfo) -> bool {
        fn matches(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
        }
        matches(&self.os, &other.os) && matches(&self.browser, &other.browser) && self.device_type == other.device_type
    }
}

/// Minimal hand-rolled UA parser, covering the families needed for
/// fingerprinting rather than a general-purpose UA database.
pub fn parse_device(user_agent: &str) -> DeviceInfo {
    let ua = user_agent;

    let os = if ua.contains("Windows") {
        Some("Windows".to_string())
    } else if ua.contains("Mac OS X") || ua.contains("Macintosh") {
        Some("macOS".to_string())
    } else if ua.contains("Android") {
        Some("Android".to_string())
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        Some("iOS".to_string())
    } else if ua.contains("Linux") {
        Some("Linux".to_string())
    } else {
        None
    };

    let os_version = extract_version(ua, "Windows NT ")
        .or_else(|| extract_version(ua, "Mac OS X ").map(|v| v.replace('_', ".")))
        .or_else(|| extract_version(ua, "Android "))
        .or_else(|| extract_version(ua, "OS ").map(|v| v.replace('_', ".")));

    let (browser, browser_version) = if ua.contains("Edg/") {
        ("Edge", extract_version(ua, "Edg/"))
    } else if ua.contains("Chrome/") {
        ("Chrome", extract_version(ua, "Chrome/"))
    } else if ua.contains("Firefox/") {
        ("Firefox", extract_version(ua, "Firefox/"))
    } else if ua.contains("Safari/") && ua.contains("Version/") {
        ("Safari", extract_version(ua, "Version/"))
    } else {
        ("Unknown", None)
    };

    let device_type = if ua.contains("iPad") || ua.contains("Tablet") {
        DeviceType::Tablet
    } else if ua.contains("Mobile") || ua.contains("iPhone") || ua.contains("Android") {
        DeviceType::Mobile
    } else if os.is_some() {
        DeviceType::Desktop
    } else {
        DeviceType::Unknown
    };

    DeviceInfo {
        os,
        os_version,
        browser: Some(browser.to_string()).filter(|b| b != "Unknown"),
        browser_version,
        device_type,
    }
}

fn extract_version(ua: &str, marker: &str) -> Option<String> {
    let start = ua.find(marker)? + marker.len();
    let rest = &ua[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '_'))
        .unwrap_or(rest.len());
    let version = &rest[..end];
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

/// Great-circle distance in kilometers.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let (lat1_r, lat2_r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// §4.3: suspicious if `d >= 500km` within 60 minutes, or `d >= 2000km`
/// within 180 minutes.
pub fn is_suspicious_travel(distance_km: f64, delta_minutes: f64) -> bool {
    (distance_km >= 500.0 && delta_minutes < 60.0) || (distance_km >= 2000.0 && delta_minutes < 180.0)
}

fn is_private_or_loopback(ip: &str) -> bool {
    use std::net::IpAddr;
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local()
        }
        Ok(IpAddr::V6(v6)) => v6.is_loopback() || (v6.segments()[0] & 0xfe00) == 0xfc00,
        Err(_) => false,
    }
}

fn local_network_result() -> ResolvedLocation {
    ResolvedLocation {
        city: None,
        country: None,
        latitude: 0.0,
        longitude: 0.0,
        pretty: "Local Network".to_string(),
    }
}

#[derive(Clone)]
pub struct GeolocationService {
    client: reqwest::Client,
    redis: RedisClient,
    config: GeolocationConfig,
}

impl GeolocationService {
    pub fn new(config: GeolocationConfig, redis: RedisClient) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("reqwest client builder should not fail with these settings");
        Self { client, redis, config }
    }

    /// Resolves an IP to a location, or `None` on any failure or timeout.
    /// Never blocks the caller past the configured deadline.
    pub async fn resolve_location(&self, ip: &str) -> Option<ResolvedLocation> {
        if is_private_or_loopback(ip) {
            return Some(local_network_result());
        }

        if let Ok(Some(cached)) = self.redis.get_cached_geolocation::<ResolvedLocation>(ip).await {
            return Some(cached);
        }

        let provider_url = self.config.provider_url.as_ref()?;
        let url = format!("{provider_url}/{ip}/json");

        let result = tokio::time::timeout(Duration::from_secs(self.config.timeout_seconds), async {
            let response = self.client.get(&url).send().await.ok()?;
            response.json::<ProviderResponse>().await.ok()
        })
        .await;

        let parsed = match result {
            Ok(Some(body)) => body,
            Ok(None) | Err(_) => {
                warn!(ip, "geolocation lookup failed or timed out");
                return None;
            }
        };

        let (lat, lon) = (parsed.latitude?, parsed.longitude?);
        let pretty = match (&parsed.city, &parsed.country_name) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (Some(city), None) => city.clone(),
            (None, Some(country)) => country.clone(),
            (None, None) => "Unknown".to_string(),
        };

        let resolved = ResolvedLocation {
            city: parsed.city,
            country: parsed.country_name,
            latitude: lat,
            longitude: lon,
            pretty,
        };

        let _ = self
            .redis
            .cache_geolocation(ip, &resolved, Duration::from_secs(24 * 3600))
            .await;

        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chrome_on_windows() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        let info = parse_device(ua);
        assert_eq!(info.os.as_deref(), Some("Windows"));
        assert_eq!(info.browser.as_deref(), Some("Chrome"));
        assert_eq!(info.device_type, DeviceType::Desktop);
    }

    #[test]
    fn parses_mobile_safari_on_ios() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
        let info = parse_device(ua);
        assert_eq!(info.os.as_deref(), Some("iOS"));
        assert_eq!(info.device_type, DeviceType::Mobile);
    }

    #[test]
    fn fingerprint_concatenates_with_dashes() {
        let info = DeviceInfo {
            os: Some("macOS".into()),
            os_version: Some("14.1".into()),
            browser: Some("Chrome".into()),
            browser_version: Some("120".into()),
            device_type: DeviceType::Desktop,
        };
        assert_eq!(info.fingerprint(), "macOS 14.1 - Chrome 120 - desktop");
    }

    #[test]
    fn same_device_treats_unset_fields_as_wildcards() {
        let full = DeviceInfo {
            os: Some("macOS".into()),
            os_version: Some("14.1".into()),
            browser: Some("Chrome".into()),
            browser_version: Some("120".into()),
            device_type: DeviceType::Desktop,
        };
        let partial = DeviceInfo {
            os: Some("macOS".into()),
            os_version: None,
            browser: Some("Chrome".into()),
            browser_version: None,
            device_type: DeviceType::Desktop,
        };
        assert!(full.same_device(&partial));
    }

    #[test]
    fn haversine_new_york_to_san_francisco_is_roughly_4130_km() {
        let d = haversine(40.71, -74.01, 37.77, -122.42);
        assert!((4100.0..4170.0).contains(&d), "got {d}");
    }

    #[test]
    fn suspicious_travel_boundary_matches_spec_thresholds() {
        assert!(!is_suspicious_travel(500.0, 60.0));
        assert!(is_suspicious_travel(501.0, 59.0));
        assert!(is_suspicious_travel(2000.0, 179.0));
        assert!(!is_suspicious_travel(1999.0, 179.0));
    }

    #[test]
    fn loopback_and_private_ranges_short_circuit() {
        assert!(is_private_or_loopback("127.0.0.1"));
        assert!(is_private_or_loopback("10.0.0.5"));
        assert!(is_private_or_loopback("192.168.1.1"));
        assert!(!is_private_or_loopback("8.8.8.8"));
    }
}
