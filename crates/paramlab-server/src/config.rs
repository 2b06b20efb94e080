//! Server configuration

use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, time::Duration};
use url::Url;

/// Environment variable naming the upstream generation backend
pub const BACKEND_URL_ENV: &str = "BACKEND_URL";

/// Upstream used when neither the file nor the environment names one
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server binding address
    pub bind: SocketAddr,

    /// Upstream backend that performs generation, scoring, storage and export
    pub backend: BackendConfig,

    /// CORS configuration
    pub cors: CorsConfig,

    /// Request limits
    pub limits: RequestLimits,
}

/// Upstream backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://localhost:3001`
    pub url: String,

    /// Whole-request timeout in seconds; unset means wait indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Connection timeout in seconds; unset means the client default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    /// Retry policy for transient upstream failures
    pub retry: RetryConfig,
}

/// Bounded retry with exponential backoff. Zero retries fails immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Additional attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    pub base_delay_ms: u64,

    /// Cap on any single delay in milliseconds
    pub max_delay_ms: u64,

    /// Randomize each delay uniformly in `[0, delay]`
    pub jitter: bool,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,

    /// Allowed origins (empty or `*` means all)
    pub allowed_origins: Vec<String>,

    /// Max age for preflight requests
    pub max_age: u64,
}

/// Request size limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend: BackendConfig::default(),
            cors: CorsConfig::default(),
            limits: RequestLimits::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: None,
            connect_timeout_secs: None,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            jitter: true,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["*".to_string()],
            max_age: 3600,
        }
    }
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Parsed base URL; only http and https are accepted
    pub fn base_url(&self) -> Result<Url, String> {
        let url = Url::parse(&self.url).map_err(|e| format!("Invalid backend URL '{}': {}", self.url, e))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(format!("Unsupported backend URL scheme: {}", other)),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file, then `PARAMLAB_*` variables
    /// (`PARAMLAB_BACKEND__URL`), then `BACKEND_URL`.
    pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(Self::env_source())
            .build()?;

        let config: Self = settings.try_deserialize()?;
        Ok(config.with_backend_override(std::env::var(BACKEND_URL_ENV).ok()))
    }

    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(Self::env_source())
            .build()?;

        let config: Self = settings.try_deserialize()?;
        Ok(config.with_backend_override(std::env::var(BACKEND_URL_ENV).ok()))
    }

    fn env_source() -> config::Environment {
        config::Environment::with_prefix("PARAMLAB")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Replace the backend URL when an override is present and non-blank
    pub fn with_backend_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.backend.url = url.trim().to_string();
        }
        self
    }

    /// Check values that deserialization alone cannot
    pub fn validate(&self) -> Result<(), String> {
        self.backend.base_url()?;
        let retry = &self.backend.retry;
        if retry.max_delay_ms < retry.base_delay_ms {
            return Err(format!(
                "retry.max_delay_ms ({}) is smaller than retry.base_delay_ms ({})",
                retry.max_delay_ms, retry.base_delay_ms
            ));
        }
        if self.limits.max_body_size == 0 {
            return Err("limits.max_body_size must be positive".to_string());
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file() -> NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.backend.url, "http://localhost:3001");
        assert_eq!(config.backend.timeout(), None);
        assert_eq!(config.backend.retry.max_retries, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backend_override() {
        let config = ServerConfig::default().with_backend_override(Some(" http://backend:9000 ".into()));
        assert_eq!(config.backend.url, "http://backend:9000");

        let config = ServerConfig::default().with_backend_override(Some("   ".into()));
        assert_eq!(config.backend.url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = toml_file();
        writeln!(
            file,
            r#"
bind = "0.0.0.0:8088"

[backend]
url = "https://scoring.internal"
timeout_secs = 30

[backend.retry]
max_retries = 2
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.bind.port(), 8088);
        assert_eq!(config.backend.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.backend.retry.max_retries, 2);
        assert_eq!(config.backend.retry.base_delay_ms, 200);
        assert!(config.cors.enabled);
    }

    #[test]
    fn test_round_trip_through_file() {
        let file = toml_file();
        let mut config = ServerConfig::default();
        config.backend.connect_timeout_secs = Some(5);
        config.to_file(file.path()).unwrap();

        let loaded = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.backend.connect_timeout_secs, Some(5));
        assert_eq!(loaded.backend.retry, config.backend.retry);
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ServerConfig::default();
        config.backend.url = "ftp://example.com".to_string();
        assert!(config.validate().unwrap_err().contains("scheme"));

        let mut config = ServerConfig::default();
        config.backend.url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.backend.retry.max_delay_ms = 10;
        assert!(config.validate().is_err());
    }
}
