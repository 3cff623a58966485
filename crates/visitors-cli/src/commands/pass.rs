//! Visitor pass management commands.

use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use visitors_core::error::AppError;
use visitors_core::types::VisitorPassId;
use visitors_entity::pass::{CreateVisitorPass, Expiry, VisitorPass};
use visitors_entity::visit_log::RequestMeta;

/// Arguments for pass commands
#[derive(Debug, Args)]
pub struct PassArgs {
    /// Pass subcommand
    #[command(subcommand)]
    pub command: PassCommand,
}

/// Pass subcommands
#[derive(Debug, Subcommand)]
pub enum PassCommand {
    /// Issue a new pass
    Create {
        /// Holder email
        #[arg(short, long)]
        email: String,
        /// Scope the pass grants access to
        #[arg(short, long)]
        scope: String,
        /// Holder first name
        #[arg(long, default_value = "")]
        first_name: String,
        /// Holder last name
        #[arg(long, default_value = "")]
        last_name: String,
        /// Visit quota (defaults to the configured value)
        #[arg(long)]
        max_visits: Option<i32>,
        /// Lifetime in seconds (defaults to the configured value)
        #[arg(long, conflicts_with = "never_expires")]
        expires_in: Option<i64>,
        /// Issue a pass with no expiry time
        #[arg(long)]
        never_expires: bool,
        /// Context data as a JSON document
        #[arg(long)]
        context: Option<String>,
        /// Print the pass tokenised into this URL
        #[arg(long)]
        url: Option<String>,
    },
    /// Show a pass
    Show {
        /// Pass ID
        id: VisitorPassId,
    },
    /// List passes by holder email or by scope
    List {
        /// Holder email
        #[arg(short, long, required_unless_present = "scope")]
        email: Option<String>,
        /// Scope
        #[arg(short, long, conflicts_with = "email")]
        scope: Option<String>,
        /// Maximum number of passes listed by scope
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },
    /// Check that a pass is active and unexpired
    Validate {
        /// Pass ID
        id: VisitorPassId,
    },
    /// Admit one request with a pass, counting and logging the visit
    Visit {
        /// Pass ID
        id: VisitorPassId,
        /// HTTP method to record
        #[arg(long, default_value = "GET")]
        method: String,
        /// Request path to record
        #[arg(long)]
        path: Option<String>,
        /// Client address to record
        #[arg(long)]
        remote_addr: Option<String>,
    },
    /// Revoke a pass
    Deactivate {
        /// Pass ID
        id: VisitorPassId,
    },
    /// Re-enable a pass with a fresh expiry window
    Reactivate {
        /// Pass ID
        id: VisitorPassId,
    },
    /// Embed a pass token into a URL
    Tokenise {
        /// Pass ID
        id: VisitorPassId,
        /// URL to rewrite
        url: String,
    },
    /// Find the pass referenced by a tokenised URL
    Resolve {
        /// Tokenised URL
        url: String,
    },
    /// Delete a pass and its visit logs
    Delete {
        /// Pass ID
        id: VisitorPassId,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Pass display row
#[derive(Debug, Serialize, Tabled)]
struct PassRow {
    /// Pass ID
    id: String,
    /// Email
    email: String,
    /// Scope
    scope: String,
    /// Visits
    visits: String,
    /// Active
    active: String,
    /// Expires
    expires: String,
    /// Valid now
    valid: String,
}

impl From<&VisitorPass> for PassRow {
    fn from(pass: &VisitorPass) -> Self {
        Self {
            id: pass.id.to_string(),
            email: pass.email.clone(),
            scope: pass.scope.clone(),
            visits: format!("{}/{}", pass.visits_count, pass.max_visits),
            active: if pass.is_active { "✓" } else { "✗" }.to_string(),
            expires: pass
                .expires_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
            valid: if pass.is_valid(Utc::now()) { "✓" } else { "✗" }.to_string(),
        }
    }
}

/// `now` plus `seconds`, rejecting lifetimes that are not positive or overflow.
fn expires_in_seconds(now: DateTime<Utc>, seconds: i64) -> Result<Expiry, AppError> {
    if seconds <= 0 {
        return Err(AppError::validation("--expires-in must be positive"));
    }
    TimeDelta::try_seconds(seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .map(Expiry::At)
        .ok_or_else(|| AppError::validation(format!("--expires-in {seconds} is out of range")))
}

/// Execute pass commands
pub async fn execute(
    args: &PassArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let (service, db) = super::build_service(&config).await?;

    match &args.command {
        PassCommand::Create {
            email,
            scope,
            first_name,
            last_name,
            max_visits,
            expires_in,
            never_expires,
            context,
            url,
        } => {
            let context = context
                .as_deref()
                .map(|raw| serde_json::from_str::<serde_json::Value>(raw))
                .transpose()?;
            let expires = match (expires_in, never_expires) {
                (_, true) => Expiry::Never,
                (Some(seconds), false) => expires_in_seconds(Utc::now(), *seconds)?,
                (None, false) => Expiry::Default,
            };

            let pass = service
                .create(CreateVisitorPass {
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    max_visits: *max_visits,
                    expires,
                    context,
                    ..CreateVisitorPass::new(email.clone(), scope.clone())
                })
                .await?;

            output::print_success(&format!("Created {pass}"));
            output::print_list(&[PassRow::from(&pass)], format);
            if let Some(url) = url {
                println!("{}", service.tokenise(pass.id, url).await?);
            }
        }
        PassCommand::Show { id } => {
            let pass = service.get(*id).await?;
            match format {
                OutputFormat::Json => output::print_item(&pass.serialize(), format),
                OutputFormat::Table => {
                    output::print_item(&pass, format);
                    output::print_kv("valid", &pass.is_valid(Utc::now()).to_string());
                    output::print_kv("remaining_visits", &pass.remaining_visits().to_string());
                }
            }
        }
        PassCommand::List {
            email,
            scope,
            limit,
        } => {
            let passes = match (email, scope) {
                (Some(email), _) => service.list_by_email(email).await?,
                (None, Some(scope)) => {
                    let (pass_repo, _) = db.repositories();
                    pass_repo.find_by_scope(scope, *limit).await?
                }
                (None, None) => Vec::new(),
            };
            let rows: Vec<PassRow> = passes.iter().map(PassRow::from).collect();
            output::print_list(&rows, format);
        }
        PassCommand::Validate { id } => {
            let pass = service.validate(*id).await?;
            if pass.remaining_visits() == 0 {
                output::print_warning(&format!("{pass} is active but has no visits left"));
            } else {
                output::print_success(&format!("{pass} is valid"));
            }
        }
        PassCommand::Visit {
            id,
            method,
            path,
            remote_addr,
        } => {
            let request = RequestMeta {
                method: Some(method.clone()),
                path: path.clone(),
                remote_addr: remote_addr.clone(),
                ..Default::default()
            };
            let pass = service.admit(*id, &request).await?;
            output::print_success(&format!(
                "Visit {}/{} registered",
                pass.visits_count, pass.max_visits
            ));
        }
        PassCommand::Deactivate { id } => {
            let pass = service.deactivate(*id).await?;
            output::print_success(&format!("Deactivated {pass}"));
        }
        PassCommand::Reactivate { id } => {
            let pass = service.reactivate(*id).await?;
            output::print_success(&format!("Reactivated {pass}"));
            output::print_list(&[PassRow::from(&pass)], format);
        }
        PassCommand::Tokenise { id, url } => {
            println!("{}", service.tokenise(*id, url).await?);
        }
        PassCommand::Resolve { url } => {
            let pass = service.find_by_url(url).await?;
            output::print_list(&[PassRow::from(&pass)], format);
        }
        PassCommand::Delete { id, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete pass {id} and its visit logs?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            service.delete(*id).await?;
            output::print_success(&format!("Pass {id} deleted"));
        }
    }

    db.close().await;
    Ok(())
}
