//! Visit log commands.

use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use visitors_core::error::AppError;
use visitors_core::types::VisitorPassId;

/// Arguments for log commands
#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Log subcommand
    #[command(subcommand)]
    pub command: LogsCommand,
}

/// Log subcommands
#[derive(Debug, Subcommand)]
pub enum LogsCommand {
    /// Show recent requests made with a pass
    List {
        /// Pass ID
        id: VisitorPassId,
        /// Number of entries
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
    /// Delete entries older than a number of days
    Purge {
        /// Age in days
        #[arg(short, long, default_value = "90")]
        days: i64,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Visit log display row
#[derive(Debug, Serialize, Tabled)]
struct LogRow {
    /// Time
    time: String,
    /// Visits
    visits: i32,
    /// Method
    method: String,
    /// Path
    path: String,
    /// Client
    client: String,
    /// Status
    status: i32,
}

/// The instant `days` days before `now`.
fn purge_cutoff(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, AppError> {
    if days < 0 {
        return Err(AppError::validation("--days must not be negative"));
    }
    TimeDelta::try_days(days)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| AppError::validation(format!("--days {days} is out of range")))
}

/// Execute log commands
pub async fn execute(
    args: &LogsArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (service, db) = super::build_service(&config).await?;

    match &args.command {
        LogsCommand::List { id, limit } => {
            let entries = service.logs().list_for_pass(*id, *limit).await?;
            let rows: Vec<LogRow> = entries
                .into_iter()
                .map(|e| LogRow {
                    time: e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    visits: e.visits_snapshot,
                    method: e.http_method,
                    path: e.request_uri,
                    client: e.remote_addr,
                    status: e.status_code,
                })
                .collect();
            output::print_list(&rows, format);
            if format == OutputFormat::Table {
                let total = service.logs().count_for_pass(*id).await?;
                output::print_kv("total", &total.to_string());
            }
        }
        LogsCommand::Purge { days, force } => {
            let cutoff = purge_cutoff(Utc::now(), *days)?;
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete visit logs older than {days} days?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let (_, log_repo) = db.repositories();
            let removed = log_repo.purge_before(cutoff).await?;
            output::print_success(&format!("Purged {removed} visit log entries"));
        }
    }

    db.close().await;
    Ok(())
}
