//! Database migration commands.

use clap::{Args, Subcommand};

use crate::output;
use visitors_core::error::AppError;
use visitors_database::DatabasePool;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;

    match &args.command {
        MigrateCommand::Run => {
            let db = DatabasePool::connect_and_migrate(&config.database).await?;
            db.close().await;
            output::print_success("All migrations applied successfully.");
        }
    }

    Ok(())
}
