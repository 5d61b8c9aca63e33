//! Client configuration.
//!
//! The base URL is resolved once when the client is built. `from_env` mirrors
//! how the app shell injects it (`API_URL`), falling back to the local API.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:4000";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_CSRF_COOKIE: &str = "csrf_token";
pub const DEFAULT_CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    /// Transport-level timeout for a single request.
    pub timeout: Duration,
    pub refresh_path: String,
    pub csrf_cookie: String,
    pub csrf_header: String,
    /// How long an unsubscribed query result survives before eviction.
    pub keep_unused_for: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_string(),
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
            keep_unused_for: Duration::ZERO,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Read `API_URL` and `API_TIMEOUT_SECS` from the environment.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("API_URL") {
            config.base_url = url;
        }
        if let Ok(secs) = std::env::var("API_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| ClientError::Config(format!("API_TIMEOUT_SECS is not a number: {secs}")))?;
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_keep_unused_for(mut self, keep: Duration) -> Self {
        self.keep_unused_for = keep;
        self
    }

    /// Base URL with surrounding whitespace and trailing slashes removed.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim().trim_end_matches('/').to_string()
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let base = self.normalized_base_url();
        Url::parse(&base).map_err(|e| ClientError::Config(format!("invalid base url {base:?}: {e}")))?;
        if !self.refresh_path.starts_with('/') {
            return Err(ClientError::Config(format!(
                "refresh path must start with '/': {}",
                self.refresh_path
            )));
        }
        if self.csrf_cookie.is_empty() || self.csrf_header.is_empty() {
            return Err(ClientError::Config("csrf cookie and header names must be set".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("  http://localhost:4000/ ");
        assert_eq!(config.normalized_base_url(), "http://localhost:4000");
    }

    #[test]
    fn defaults_match_wire_contract() {
        let config = ClientConfig::default();
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.csrf_cookie, "csrf_token");
        assert_eq!(config.csrf_header, "x-csrf-token");
        assert!(config.keep_unused_for.is_zero());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ClientConfig::new("not a url").validate().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn deserializes_partial_config() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"https://api.example.com/"}"#).unwrap();
        assert_eq!(config.normalized_base_url(), "https://api.example.com");
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
    }
}
