//! Connection profile shared by every request.

use std::time::Duration;

/// Public address of the analysis service.
pub const DEFAULT_BASE_URL: &str = "https://gemini-analysis-api.onrender.com";

/// Environment variable that overrides [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "GEMINI_API_URL";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Uploads and analyses use their own timeout so it can be raised
/// independently of reads.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_millis(120_000);

/// Largest upload the service accepts. Not enforced client-side.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    pub timeout: Duration,
    pub upload_timeout: Duration,
    pub default_headers: Vec<(String, String)>,
    pub max_upload_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            default_headers: vec![("accept".to_string(), "application/json".to_string())],
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Defaults, with the base URL taken from `GEMINI_API_URL` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(BASE_URL_ENV) {
            Some(url) if !url.trim().is_empty() => Self::new(url.trim()),
            _ => Self::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.default_headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Absolute URL for an endpoint path such as `/results/7`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_service_profile() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.upload_timeout, Duration::from_secs(120));
        assert_eq!(config.max_upload_bytes, 10_485_760);
        assert_eq!(
            config.default_headers,
            vec![("accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:8000/");
        assert_eq!(config.url("/health"), "http://localhost:8000/health");
        assert_eq!(config.url("results"), "http://localhost:8000/results");
    }

    #[test]
    fn env_override_replaces_base_url() {
        let config = ClientConfig::from_lookup(|key| {
            assert_eq!(key, BASE_URL_ENV);
            Some("http://10.0.0.5:9000/".to_string())
        });
        assert_eq!(config.base_url(), "http://10.0.0.5:9000");
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let config = ClientConfig::from_lookup(|_| Some("   ".to_string()));
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
    }
}
