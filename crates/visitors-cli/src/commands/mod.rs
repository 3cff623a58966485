//! CLI command definitions and dispatch.

pub mod config;
pub mod logs;
pub mod migrate;
pub mod pass;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use visitors_core::clock::SystemClock;
use visitors_core::config::AppConfig;
use visitors_core::config::logging::LoggingConfig;
use visitors_core::error::AppError;
use visitors_database::DatabasePool;
use visitors_service::{PassService, VisitLogService};

/// Issue, inspect and revoke visitor passes
#[derive(Debug, Parser)]
#[command(name = "visitors", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (extension optional)
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Visitor pass management
    Pass(pass::PassArgs),
    /// Visit log inspection
    Logs(logs::LogsArgs),
    /// Database migrations
    Migrate(migrate::MigrateArgs),
    /// Configuration inspection
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Pass(args) => pass::execute(args, &self.config, self.format).await,
            Commands::Logs(args) => logs::execute(args, &self.config, self.format).await,
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Config(args) => config::execute(args, &self.config, self.format).await,
        }
    }

    /// Logging settings from the config file, or defaults if it cannot be read.
    pub fn logging(&self) -> LoggingConfig {
        AppConfig::load_file(&self.config)
            .map(|c| c.logging)
            .unwrap_or_default()
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    tracing::debug!(path = %config_path, "Loading configuration");
    AppConfig::load_file(config_path)
}

/// Helper: connect to the database and wire up the pass service
pub async fn build_service(config: &AppConfig) -> Result<(PassService, DatabasePool), AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    let (passes, logs) = db.repositories();
    let clock = Arc::new(SystemClock);

    let log_service = Arc::new(VisitLogService::new(Arc::new(logs), clock.clone()));
    let service = PassService::new(
        Arc::new(passes),
        log_service,
        clock,
        config.visitors.clone(),
    );

    Ok((service, db))
}
