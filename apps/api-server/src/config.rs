//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use domain::matching::MatchMode;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Ledger backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory ledger (data lost on restart)
    Memory,
    /// SQLite file-based ledger
    Sqlite,
}

impl StorageProvider {
    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ConfigError {
                field: "STORAGE_PROVIDER",
                message: format!("Expected 'memory' or 'sqlite', got '{}'", s),
            }),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError {
                field: "LOG_FORMAT",
                message: format!("Expected 'pretty' or 'json', got '{}'", s),
            }),
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Ledger backend
    pub storage_provider: StorageProvider,
    /// SQLite database path (when using sqlite storage)
    #[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
    pub db_path: Option<PathBuf>,
    /// Log format
    pub log_format: LogFormat,
    /// How personal/organization ids are matched by search and update
    pub match_mode: MatchMode,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}'", raw),
            })?,
            None => 3001,
        };

        let cors_origin_str = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        let storage_provider = StorageProvider::from_str(
            &lookup("STORAGE_PROVIDER").unwrap_or_else(|| "sqlite".into()),
        )?;

        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()))?;

        let match_mode = match lookup("MATCH_MODE") {
            Some(raw) => MatchMode::parse(&raw).ok_or_else(|| ConfigError {
                field: "MATCH_MODE",
                message: format!("Expected 'substring' or 'exact', got '{}'", raw),
            })?,
            None => MatchMode::Substring,
        };

        Ok(Self {
            port,
            cors_allow_origin,
            storage_provider,
            db_path,
            log_format,
            match_mode,
        })
    }

    /// Log warnings about configurations that lose data or diverge from the
    /// legacy behavior.
    pub fn warn_if_unusual(&self) {
        if self.storage_provider == StorageProvider::Memory {
            tracing::warn!("STORAGE_PROVIDER=memory: ledger state is lost on restart.");
        }
        if self.match_mode == MatchMode::Exact {
            tracing::warn!(
                "MATCH_MODE=exact: id lookups no longer match partial ids as older clients expect."
            );
        }
    }
}
