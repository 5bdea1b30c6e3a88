//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use axum::http::HeaderValue;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// The JSON document holding projects and tasks.
    pub db_path: PathBuf,
    pub log_level: Level,
    /// Single allowed browser origin. `None` allows any origin.
    pub cors_origin: Option<HeaderValue>,
    /// Whether completion chimes are rendered and pushed to timer clients.
    pub chime_enabled: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:5174".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let db_path = var("DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./db.json"));
        if db_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingVar("DB_PATH".to_string()));
        }

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = match var("CORS_ORIGIN").filter(|s| !s.trim().is_empty()) {
            Some(origin) => Some(HeaderValue::from_str(origin.trim()).map_err(|e| {
                ConfigError::InvalidValue("CORS_ORIGIN".to_string(), e.to_string())
            })?),
            None => None,
        };

        let chime_enabled = match var("CHIME_ENABLED") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CHIME_ENABLED".to_string(),
                    format!("'{}' is not a boolean", raw),
                )
            })?,
            None => true,
        };

        Ok(Self {
            bind_address,
            db_path,
            log_level,
            cors_origin,
            chime_enabled,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
