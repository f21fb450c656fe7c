//! Configuration module for scanguard.
//!
//! Handles engine connection configuration, environment variables, and settings.

mod connection;
mod settings;

pub use connection::{
    ConnectionError, EngineConfig, HttpScheme, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SOURCE,
};
pub use settings::{
    expand_env_vars, parse_size, EngineSettings, GateSettings, OutputSettings, Settings,
    SettingsError, SizeSetting,
};
