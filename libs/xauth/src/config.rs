//! Provider configuration

use crate::error::{XAuthError, XAuthResult};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// What to do after a response comes back with `429 Too Many Requests`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitPolicy {
    /// Pause for the retry interval, then continue with the rate-limited body
    #[default]
    Pause,
    /// Pause, then re-send the same request up to `max_retries` times
    Resend,
}

/// Endpoints, header constants and retry settings for the X web client.
///
/// Loaded once per process and shared read-only by every flow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// OAuth1 authenticate page (Stage A)
    pub authenticate_url: String,
    /// OAuth1 authorize form target (Stage B)
    pub authorize_url: String,
    /// OAuth2 authorize API endpoint (Stages C and D)
    pub oauth2_authorize_url: String,
    /// Value of the `authority` header
    pub authority: String,
    /// Value of the `origin` header
    pub origin: String,
    pub user_agent: String,
    /// Web client bearer token, without the `Bearer ` prefix
    pub bearer_token: String,
    /// Domains the `auth_token` cookie is seeded for
    pub cookie_domains: Vec<String>,
    /// Name of the cookie that carries the CSRF token
    pub csrf_cookie: String,
    /// Top-level `code` value meaning "retry with a CSRF token"
    pub csrf_sentinel_code: i64,
    /// Connect and request timeout, in seconds
    pub timeout_secs: u64,
    /// Pause after a rate-limited response, in milliseconds
    pub retry_interval_ms: u64,
    pub rate_limit: RateLimitPolicy,
    /// Re-send cap for [`RateLimitPolicy::Resend`]
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authenticate_url: "https://api.x.com/oauth/authenticate".to_string(),
            authorize_url: "https://x.com/oauth/authorize".to_string(),
            oauth2_authorize_url: "https://twitter.com/i/api/2/oauth2/authorize".to_string(),
            authority: "twitter.com".to_string(),
            origin: "https://twitter.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            bearer_token: "AAAAAAAAAAAAAAAAAAAAANRILgAAAAAAnNwIzUejRCOuH5E6I8xnZz4puTs%3D1Zv7ttfk8LF81IUq16cHjhLTvJu4FA33AGWWjCpTnA".to_string(),
            cookie_domains: vec!["x.com".to_string(), "twitter.com".to_string()],
            csrf_cookie: "ct0".to_string(),
            csrf_sentinel_code: 353,
            timeout_secs: 10,
            retry_interval_ms: 1000,
            rate_limit: RateLimitPolicy::Pause,
            max_retries: 3,
        }
    }
}

impl ProviderConfig {
    /// Parse a configuration from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> XAuthResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> XAuthResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check that every endpoint is an absolute http(s) URL and that the
    /// cookie settings are usable
    pub fn validate(&self) -> XAuthResult<()> {
        for (name, value) in [
            ("authenticate_url", &self.authenticate_url),
            ("authorize_url", &self.authorize_url),
            ("oauth2_authorize_url", &self.oauth2_authorize_url),
        ] {
            let url = reqwest::Url::parse(value)
                .map_err(|e| XAuthError::config(format!("{} '{}': {}", name, value, e)))?;
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                return Err(XAuthError::config(format!(
                    "{} must be an http(s) URL with a host, got '{}'",
                    name, value
                )));
            }
        }

        if self.cookie_domains.is_empty() {
            return Err(XAuthError::config("cookie_domains must not be empty"));
        }
        if self.csrf_cookie.trim().is_empty() {
            return Err(XAuthError::config("csrf_cookie must not be empty"));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Value of the `authorization` header
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.bearer_token)
    }
}
