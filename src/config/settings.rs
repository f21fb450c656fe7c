//! TOML-based configuration for scanguard.
//!
//! Supports a config file (scanguard.toml) with environment variable expansion
//! in connection fields, so credentials never need to live in the file.
//!
//! Example configuration:
//! ```toml
//! [engine]
//! host = "trino.example.com"
//! port = 31085
//! user = "${TRINO_USER}"
//! password = "${TRINO_PASSWORD}"
//! catalog = "oracle"
//! verify_tls = false
//!
//! [gate]
//! threshold = "1GiB"
//!
//! [output]
//! preview_rows = 5
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::connection::{
    EngineConfig, HttpScheme, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SOURCE,
};
use crate::gate::DEFAULT_THRESHOLD_BYTES;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("No [engine] section configured")]
    MissingEngine,

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Engine connection; absent means "use environment variables".
    pub engine: Option<EngineSettings>,

    /// Gate configuration.
    pub gate: GateSettings,

    /// Output configuration.
    pub output: OutputSettings,
}

/// Engine connection settings as written in the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Coordinator hostname (supports ${ENV_VAR} expansion).
    pub host: String,

    /// Port (optional, uses scheme default).
    #[serde(default)]
    pub port: Option<u16>,

    /// User name (supports ${ENV_VAR} expansion).
    pub user: String,

    /// Password (supports ${ENV_VAR} expansion).
    #[serde(default)]
    pub password: Option<String>,

    /// `http` or `https`.
    #[serde(default = "default_scheme")]
    pub http_scheme: String,

    #[serde(default)]
    pub catalog: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,

    /// Value of `X-Trino-Source`.
    #[serde(default = "default_source")]
    pub source: String,

    /// Verify the coordinator's TLS certificate.
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_scheme() -> String {
    HttpScheme::default().as_str().to_string()
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_verify_tls() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl EngineSettings {
    /// Resolve into an [`EngineConfig`], expanding environment variables.
    pub fn resolve(&self) -> Result<EngineConfig, SettingsError> {
        let scheme = HttpScheme::from_str(&self.http_scheme)
            .map_err(|e| SettingsError::InvalidConfig(e.to_string()))?;

        let config = EngineConfig {
            host: expand_env_vars(&self.host)?,
            port: self.port,
            scheme,
            user: expand_env_vars(&self.user)?,
            password: self.password.as_deref().map(expand_env_vars).transpose()?,
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            source: self.source.clone(),
            verify_tls: self.verify_tls,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        };

        config
            .validate()
            .map_err(|e| SettingsError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }
}

/// A size written either as a byte count or as a string like `"1GiB"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SizeSetting {
    Bytes(u64),
    Text(String),
}

impl SizeSetting {
    pub fn to_bytes(&self) -> Result<u64, SettingsError> {
        match self {
            SizeSetting::Bytes(n) => Ok(*n),
            SizeSetting::Text(s) => parse_size(s),
        }
    }
}

/// Gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GateSettings {
    /// Size above which confirmation is required.
    pub threshold: SizeSetting,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            threshold: SizeSetting::Bytes(DEFAULT_THRESHOLD_BYTES),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Number of rows shown in the result preview.
    pub preview_rows: usize,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { preview_rows: 5 }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `SCANGUARD_CONFIG`
    /// 2. `./scanguard.toml`
    /// 3. `~/.config/scanguard/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("SCANGUARD_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("scanguard.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("scanguard").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Engine configuration from the `[engine]` section, falling back to
    /// `SCANGUARD_*` environment variables.
    pub fn engine_config(&self) -> Result<EngineConfig, SettingsError> {
        match &self.engine {
            Some(engine) => engine.resolve(),
            None => EngineConfig::from_env().map_err(|e| match e {
                super::ConnectionError::MissingEnvVar(_) => SettingsError::MissingEngine,
                other => SettingsError::InvalidConfig(other.to_string()),
            }),
        }
    }

    /// Gate threshold in bytes.
    pub fn threshold_bytes(&self) -> Result<u64, SettingsError> {
        self.gate.threshold.to_bytes()
    }
}

/// Parse a human-readable size.
///
/// Accepts a plain byte count or a number followed by `B`, `KB`, `MB`, `GB`,
/// `TB` (powers of 1000) or `KiB`, `MiB`, `GiB`, `TiB` (powers of 1024).
/// Suffixes are case-insensitive and may be separated by whitespace.
pub fn parse_size(s: &str) -> Result<u64, SettingsError> {
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| SettingsError::InvalidSize(s.to_string()))?;

    let multiplier: u64 = match unit.trim().to_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "tb" => 1_000_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        "tib" => 1 << 40,
        _ => return Err(SettingsError::InvalidSize(s.to_string())),
    };

    let bytes = value * multiplier as f64;
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(SettingsError::InvalidSize(s.to_string()));
    }
    Ok(bytes.round() as u64)
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name = if chars.peek() == Some(&'{') {
            chars.next();
            let mut name = String::new();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                name.push(ch);
            }
            name
        } else {
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_alphanumeric() || ch == '_' {
                    name.push(ch);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
