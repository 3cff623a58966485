//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod logging;
pub mod visitors;

use serde::{Deserialize, Serialize};

use self::logging::LoggingConfig;
use self::visitors::VisitorsConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// file plus `VISITORS__` environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Visitor pass defaults.
    #[serde(default)]
    pub visitors: VisitorsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    /// Idle connection timeout in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
}

impl AppConfig {
    /// Load configuration from a single explicit file plus environment overrides.
    pub fn load_file(path: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(true))
            .add_source(
                config::Environment::with_prefix("VISITORS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded.visitors.check()?;
        Ok(loaded)
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let raw = r#"
            [database]
            url = "postgres://localhost/visitors"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.visitors.querystring_key, "vuid");
        assert_eq!(config.visitors.default_max_visits, 10);
        assert!(!config.visitors.reactivate_resets_visits);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_deserialize_visitors_section() {
        let raw = r#"
            [database]
            url = "postgres://localhost/visitors"

            [visitors]
            default_token_expiry_seconds = 60
            default_max_visits = 3
            reactivate_resets_visits = true
            querystring_key = "pass"
        "#;
        let config: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.visitors.token_expiry(), chrono::Duration::seconds(60));
        assert_eq!(config.visitors.default_max_visits, 3);
        assert!(config.visitors.reactivate_resets_visits);
        assert_eq!(config.visitors.querystring_key, "pass");
    }
}
