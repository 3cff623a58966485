//! PostgreSQL connection pool management.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use visitors_core::config::DatabaseConfig;
use visitors_core::error::{AppError, ErrorKind};

use crate::migration::run_migrations;
use crate::repositories::{PassRepository, VisitLogRepository};

/// Wrapper around the sqlx PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Open a pool using `config`.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %redact_url(&config.url),
            max_connections = config.max_connections,
            "Connecting to visitor pass database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Open a pool and bring the schema up to date.
    pub async fn connect_and_migrate(config: &DatabaseConfig) -> Result<Self, AppError> {
        let db = Self::connect(config).await?;
        run_migrations(&db.pool).await?;
        Ok(db)
    }

    /// Pass and visit log repositories sharing this pool.
    pub fn repositories(&self) -> (PassRepository, VisitLogRepository) {
        (
            PassRepository::new(self.pool.clone()),
            VisitLogRepository::new(self.pool.clone()),
        )
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Replace the password in a database URL with `****` for logging.
pub fn redact_url(url: &str) -> String {
    let Some(at_pos) = url.rfind('@') else {
        return url.to_string();
    };
    let scheme_end = url.find("://").map_or(0, |p| p + 3);
    if at_pos < scheme_end {
        return url.to_string();
    }
    match url[scheme_end..at_pos].find(':') {
        Some(rel) => {
            let colon_pos = scheme_end + rel;
            format!("{}:****{}", &url[..colon_pos], &url[at_pos..])
        }
        None => url.to_string(),
    }
}
