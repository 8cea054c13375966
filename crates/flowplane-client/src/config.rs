//! Client configuration.

use std::time::Duration;

use serde::Deserialize;

/// Connection settings for the control-plane REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Host and optional port, e.g. `"nifi.internal:8443"`.
    pub host: String,

    /// `http` or `https`.
    #[serde(default = "ClientConfig::default_scheme")]
    pub http_scheme: String,

    /// Path prefix of the REST API.
    #[serde(default = "ClientConfig::default_api_path")]
    pub api_path: String,

    /// Username for token authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// Password for token authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// Per-call timeout in seconds.
    #[serde(default = "ClientConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Accept self-signed server certificates on https.
    #[serde(default = "ClientConfig::default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl ClientConfig {
    fn default_scheme() -> String {
        "https".to_string()
    }

    fn default_api_path() -> String {
        "nifi-api".to_string()
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_accept_invalid_certs() -> bool {
        true
    }

    /// Create a configuration for the given host with defaults elsewhere.
    #[must_use]
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            http_scheme: Self::default_scheme(),
            api_path: Self::default_api_path(),
            username: None,
            password: None,
            request_timeout_seconds: Self::default_request_timeout(),
            accept_invalid_certs: Self::default_accept_invalid_certs(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `NIFI_HOST`: host and port of the control plane (default `localhost:8443`)
    /// - `NIFI_HTTP_SCHEME`: `http` or `https`
    /// - `NIFI_API_PATH`: REST API path prefix
    /// - `NIFI_USERNAME` / `NIFI_PASSWORD`: credentials for token login
    /// - `NIFI_REQUEST_TIMEOUT_SECONDS`: per-call timeout
    /// - `NIFI_ACCEPT_INVALID_CERTS`: `true` or `false`
    #[must_use]
    pub fn from_env() -> Self {
        let mut config =
            Self::with_host(std::env::var("NIFI_HOST").unwrap_or_else(|_| "localhost:8443".into()));

        if let Ok(val) = std::env::var("NIFI_HTTP_SCHEME") {
            config.http_scheme = val;
        }
        if let Ok(val) = std::env::var("NIFI_API_PATH") {
            config.api_path = val;
        }
        if let Ok(val) = std::env::var("NIFI_USERNAME") {
            if !val.is_empty() {
                config.username = Some(val);
            }
        }
        if let Ok(val) = std::env::var("NIFI_PASSWORD") {
            if !val.is_empty() {
                config.password = Some(val);
            }
        }
        if let Ok(val) = std::env::var("NIFI_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(n) = val.parse() {
                config.request_timeout_seconds = n;
            }
        }
        if let Ok(val) = std::env::var("NIFI_ACCEPT_INVALID_CERTS") {
            if let Ok(b) = val.parse() {
                config.accept_invalid_certs = b;
            }
        }

        config
    }

    /// Base URL every request path is appended to.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}/{}",
            self.http_scheme,
            self.host.trim_end_matches('/'),
            self.api_path.trim_matches('/')
        )
    }

    /// Per-call timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Username and password, if both are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ClientConfig::with_host("nifi:8443");
        assert_eq!(config.http_scheme, "https");
        assert_eq!(config.api_path, "nifi-api");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.credentials().is_none());
    }

    #[test]
    fn base_url_trims_separators() {
        let mut config = ClientConfig::with_host("nifi:8443/");
        config.api_path = "/nifi-api/".to_string();
        assert_eq!(config.base_url(), "https://nifi:8443/nifi-api");
    }

    #[test]
    fn credentials_require_both_halves() {
        let mut config = ClientConfig::with_host("nifi");
        config.username = Some("admin".to_string());
        assert!(config.credentials().is_none());

        config.password = Some("secret".to_string());
        assert_eq!(config.credentials(), Some(("admin", "secret")));
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: ClientConfig = serde_json::from_str(r#"{"host": "nifi:8080"}"#).unwrap();
        assert_eq!(config.host, "nifi:8080");
        assert_eq!(config.http_scheme, "https");
        assert_eq!(config.request_timeout_seconds, 30);
    }
}
