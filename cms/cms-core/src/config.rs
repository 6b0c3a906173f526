//! Config - settings read from the environment
//!
//! Binaries load `.env` first (dotenvy) and then call
//! [`CmsConfig::from_env`]. Tests use [`CmsConfig::from_lookup`] with a map.

use std::collections::HashMap;

use crate::constants::{MEDIA_BUCKET_DEFAULT, MEDIA_GC_GRACE_MS_DEFAULT, TIME_MS_PER_SEC, WEBP_QUALITY_DEFAULT};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Public base URL used when none is configured.
pub const PUBLIC_BASE_URL_DEFAULT: &str = "http://127.0.0.1:8080";

/// Public base URL of the storage routes.
pub const ENV_PUBLIC_BASE_URL: &str = "SPARKLES_PUBLIC_BASE_URL";
/// Object storage bucket.
pub const ENV_BUCKET: &str = "SPARKLES_BUCKET";
/// `token:role` pairs, comma separated.
pub const ENV_ADMIN_TOKENS: &str = "SPARKLES_ADMIN_TOKENS";
/// WebP quality, 1..=100.
pub const ENV_WEBP_QUALITY: &str = "SPARKLES_WEBP_QUALITY";
/// Media sweep grace period in seconds.
pub const ENV_MEDIA_GC_GRACE_SECS: &str = "SPARKLES_MEDIA_GC_GRACE_SECS";
/// Maps API key handed to the browser map widget.
pub const ENV_MAPS_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
/// Postgres connection string.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used
    #[error("invalid {var}: {reason}")]
    Invalid {
        /// Variable name
        var: &'static str,
        /// What is wrong
        reason: String,
    },
}

/// Settings shared by the server and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmsConfig {
    /// Base URL public object URLs and upload targets are built on
    pub public_base_url: String,
    /// Bucket name
    pub bucket: String,
    /// Session token to role
    pub admin_tokens: HashMap<String, String>,
    /// WebP quality
    pub webp_quality: u8,
    /// Media sweep grace period
    pub media_gc_grace_ms: u64,
    /// Maps API key, if configured
    pub maps_api_key: Option<String>,
    /// Postgres connection string, if configured
    pub database_url: Option<String>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            public_base_url: PUBLIC_BASE_URL_DEFAULT.to_string(),
            bucket: MEDIA_BUCKET_DEFAULT.to_string(),
            admin_tokens: HashMap::new(),
            webp_quality: WEBP_QUALITY_DEFAULT,
            media_gc_grace_ms: MEDIA_GC_GRACE_MS_DEFAULT,
            maps_api_key: None,
            database_url: None,
        }
    }
}

impl CmsConfig {
    /// Read from the process environment.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read through `lookup`. Blank values count as unset.
    ///
    /// # Errors
    /// Returns error if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_PUBLIC_BASE_URL) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    var: ENV_PUBLIC_BASE_URL,
                    reason: "must start with http:// or https://".to_string(),
                });
            }
            config.public_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(bucket) = get(ENV_BUCKET) {
            config.bucket = bucket;
        }
        if let Some(tokens) = get(ENV_ADMIN_TOKENS) {
            config.admin_tokens = parse_admin_tokens(&tokens)?;
        }
        if let Some(quality) = get(ENV_WEBP_QUALITY) {
            config.webp_quality = quality
                .parse::<u8>()
                .ok()
                .filter(|q| (1..=100).contains(q))
                .ok_or_else(|| ConfigError::Invalid {
                    var: ENV_WEBP_QUALITY,
                    reason: format!("{quality:?} is not in 1..=100"),
                })?;
        }
        if let Some(secs) = get(ENV_MEDIA_GC_GRACE_SECS) {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::Invalid {
                var: ENV_MEDIA_GC_GRACE_SECS,
                reason: format!("{secs:?} is not a number of seconds"),
            })?;
            config.media_gc_grace_ms = secs.saturating_mul(TIME_MS_PER_SEC);
        }
        config.maps_api_key = get(ENV_MAPS_API_KEY);
        config.database_url = get(ENV_DATABASE_URL);

        Ok(config)
    }
}

/// Parse `token:role,token:role`. Empty items are skipped.
fn parse_admin_tokens(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once(':') {
            Some((token, role)) if !token.trim().is_empty() && !role.trim().is_empty() => {
                Ok((token.trim().to_string(), role.trim().to_string()))
            }
            _ => Err(ConfigError::Invalid {
                var: ENV_ADMIN_TOKENS,
                reason: "expected token:role pairs".to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CmsConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CmsConfig::default());
        assert_eq!(config.bucket, "cms-images");
        assert_eq!(config.webp_quality, 90);
    }

    #[test]
    fn test_values_parsed() {
        let config = CmsConfig::from_lookup(lookup(&[
            (ENV_PUBLIC_BASE_URL, "https://cms.example.com/"),
            (ENV_ADMIN_TOKENS, "abc:admin, def:editor"),
            (ENV_MEDIA_GC_GRACE_SECS, "60"),
            (ENV_MAPS_API_KEY, "  "),
        ]))
        .unwrap();
        assert_eq!(config.public_base_url, "https://cms.example.com");
        assert_eq!(config.admin_tokens.get("def").map(String::as_str), Some("editor"));
        assert_eq!(config.media_gc_grace_ms, 60_000);
        assert_eq!(config.maps_api_key, None);
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(CmsConfig::from_lookup(lookup(&[(ENV_WEBP_QUALITY, "0")])).is_err());
        assert!(CmsConfig::from_lookup(lookup(&[(ENV_ADMIN_TOKENS, "nocolon")])).is_err());
        assert!(CmsConfig::from_lookup(lookup(&[(ENV_PUBLIC_BASE_URL, "ftp://x")])).is_err());
    }
}
