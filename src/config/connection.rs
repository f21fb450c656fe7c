//! Engine connection configuration.
//!
//! Supports configuration via environment variables:
//! - `SCANGUARD_HOST`: Coordinator hostname
//! - `SCANGUARD_USER`: User name sent as `X-Trino-User`
//! - `SCANGUARD_PORT`: Port (optional, uses scheme default)
//! - `SCANGUARD_PASSWORD`: Password for HTTP basic auth (optional)
//! - `SCANGUARD_SCHEME`: `http` or `https` (optional, defaults to `https`)
//! - `SCANGUARD_CATALOG` / `SCANGUARD_SCHEMA`: Session defaults (optional)
//! - `SCANGUARD_INSECURE`: Skip TLS certificate verification when `1`/`true`

use std::env;
use std::time::Duration;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default value of `X-Trino-Source`.
pub const DEFAULT_SOURCE: &str = "scanguard";

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported HTTP scheme: {0}. Supported: http, https")]
    UnsupportedScheme(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Transport scheme for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpScheme {
    Http,
    #[default]
    Https,
}

impl HttpScheme {
    /// Parse scheme from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConnectionError> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(HttpScheme::Http),
            "https" => Ok(HttpScheme::Https),
            other => Err(ConnectionError::UnsupportedScheme(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpScheme::Http => "http",
            HttpScheme::Https => "https",
        }
    }

    /// Default port for this scheme.
    pub fn default_port(&self) -> u16 {
        match self {
            HttpScheme::Http => 8080,
            HttpScheme::Https => 443,
        }
    }
}

/// Engine connection configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Coordinator hostname.
    pub host: String,
    /// Port (optional).
    pub port: Option<u16>,
    /// Transport scheme.
    pub scheme: HttpScheme,
    /// User name.
    pub user: String,
    /// Password; enables basic auth when set.
    pub password: Option<String>,
    /// Default catalog for the session.
    pub catalog: Option<String>,
    /// Default schema for the session.
    pub schema: Option<String>,
    /// Client source name.
    pub source: String,
    /// Verify the server's TLS certificate.
    pub verify_tls: bool,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl EngineConfig {
    /// Create a config for a coordinator with defaults for everything else.
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            scheme: HttpScheme::default(),
            user: user.into(),
            password: None,
            catalog: None,
            schema: None,
            source: DEFAULT_SOURCE.to_string(),
            verify_tls: true,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SCANGUARD_HOST`
    /// - `SCANGUARD_USER`
    pub fn from_env() -> Result<Self, ConnectionError> {
        let host = env::var("SCANGUARD_HOST")
            .map_err(|_| ConnectionError::MissingEnvVar("SCANGUARD_HOST".to_string()))?;
        let user = env::var("SCANGUARD_USER")
            .map_err(|_| ConnectionError::MissingEnvVar("SCANGUARD_USER".to_string()))?;

        let mut config = Self::new(host, user);

        if let Ok(scheme) = env::var("SCANGUARD_SCHEME") {
            config.scheme = HttpScheme::from_str(&scheme)?;
        }

        if let Ok(port) = env::var("SCANGUARD_PORT") {
            let port = port
                .trim()
                .parse()
                .map_err(|_| ConnectionError::InvalidConfig(format!("invalid port: {}", port)))?;
            config.port = Some(port);
        }

        config.password = env::var("SCANGUARD_PASSWORD").ok();
        config.catalog = env::var("SCANGUARD_CATALOG").ok();
        config.schema = env::var("SCANGUARD_SCHEMA").ok();
        config.verify_tls = !env::var("SCANGUARD_INSECURE")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.host.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig("host is empty".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(ConnectionError::InvalidConfig("user is empty".to_string()));
        }
        if self.password.is_some() && self.scheme == HttpScheme::Http {
            return Err(ConnectionError::InvalidConfig(
                "password authentication requires https".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the coordinator, without a trailing slash.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme.as_str(), host, port),
            None => format!(
                "{}://{}:{}",
                self.scheme.as_str(),
                host,
                self.scheme.default_port()
            ),
        }
    }
}
