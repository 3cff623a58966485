//! Configuration inspection commands.

use clap::{Args, Subcommand};

use crate::output::{self, OutputFormat};
use visitors_core::error::AppError;
use visitors_database::connection::redact_url;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Check that the configuration loads and is usable
    Validate,
}

/// Execute config commands
pub async fn execute(
    args: &ConfigArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => {
            let mut config = super::load_config(config_path)?;
            config.database.url = redact_url(&config.database.url);
            output::print_item(&config, format);
        }
        ConfigCommand::Validate => match super::load_config(config_path) {
            Ok(config) => {
                output::print_success(&format!("Configuration '{config_path}' is valid"));
                output::print_kv("Database", &redact_url(&config.database.url));
                output::print_kv(
                    "Token expiry",
                    &format!("{}s", config.visitors.default_token_expiry_seconds),
                );
                output::print_kv("Max visits", &config.visitors.default_max_visits.to_string());
                output::print_kv(
                    "Reset on reactivate",
                    &config.visitors.reactivate_resets_visits.to_string(),
                );
                output::print_kv("Querystring key", &config.visitors.querystring_key);
            }
            Err(e) => {
                output::print_error(&format!("Configuration invalid: {e}"));
                return Err(e);
            }
        },
    }

    Ok(())
}
