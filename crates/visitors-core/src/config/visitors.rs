//! Visitor pass defaults.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Longest accepted token lifetime: one hundred years.
pub const MAX_TOKEN_EXPIRY_SECONDS: i64 = 100 * 365 * 24 * 60 * 60;

/// Defaults and policy flags applied to visitor passes.
///
/// Services hold this behind a lock and read it on every call, so an
/// updated value takes effect for the next operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorsConfig {
    /// Lifetime of a new or reactivated pass, in seconds.
    #[serde(default = "default_token_expiry")]
    pub default_token_expiry_seconds: i64,
    /// Visit quota given to passes created without an explicit one.
    #[serde(default = "default_max_visits")]
    pub default_max_visits: i32,
    /// Whether reactivating a pass restores its full visit quota.
    #[serde(default)]
    pub reactivate_resets_visits: bool,
    /// Querystring parameter carrying the pass id.
    #[serde(default = "default_querystring_key")]
    pub querystring_key: String,
    /// How many times a lost visit-count race is re-read before giving up.
    #[serde(default = "default_visit_update_retries")]
    pub visit_update_retries: u32,
}

impl VisitorsConfig {
    /// The default token lifetime as a duration.
    ///
    /// Saturates at `TimeDelta::MAX` for values `check` would reject.
    pub fn token_expiry(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::try_seconds(self.default_token_expiry_seconds)
            .unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Reject settings that cannot produce usable passes.
    pub fn check(&self) -> Result<(), AppError> {
        if self.default_token_expiry_seconds <= 0 {
            return Err(AppError::configuration(
                "visitors.default_token_expiry_seconds must be positive",
            ));
        }
        if self.default_token_expiry_seconds > MAX_TOKEN_EXPIRY_SECONDS {
            return Err(AppError::configuration(format!(
                "visitors.default_token_expiry_seconds must not exceed {MAX_TOKEN_EXPIRY_SECONDS}"
            )));
        }
        if self.default_max_visits < 0 {
            return Err(AppError::configuration(
                "visitors.default_max_visits must not be negative",
            ));
        }
        if self.querystring_key.is_empty() {
            return Err(AppError::configuration(
                "visitors.querystring_key must not be empty",
            ));
        }
        Ok(())
    }
}

impl Default for VisitorsConfig {
    fn default() -> Self {
        Self {
            default_token_expiry_seconds: default_token_expiry(),
            default_max_visits: default_max_visits(),
            reactivate_resets_visits: false,
            querystring_key: default_querystring_key(),
            visit_update_retries: default_visit_update_retries(),
        }
    }
}

fn default_token_expiry() -> i64 {
    // one week
    60 * 60 * 24 * 7
}

fn default_max_visits() -> i32 {
    10
}

fn default_querystring_key() -> String {
    "vuid".to_string()
}

fn default_visit_update_retries() -> u32 {
    3
}
