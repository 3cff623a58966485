//! Business-rule rejections raised by the pass state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use visitors_core::error::AppError;

/// Why a pass failed [`validate`](super::VisitorPass::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidPassReason {
    /// The pass was administratively revoked.
    Inactive,
    /// The pass is past its `expires_at`.
    Expired,
}

impl InvalidPassReason {
    /// Return the reason as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for InvalidPassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejections raised synchronously by pass operations.
///
/// Neither variant is transient; repeating the call against unchanged
/// state yields the same outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PassError {
    /// Raised by `validate` when the pass is inactive or expired.
    #[error("Visitor pass is {0}")]
    Invalid(InvalidPassReason),
    /// Raised by `register_visit` when the quota is already used up.
    #[error("Maximum allowed visits exceeded ({visits_count}/{max_visits})")]
    QuotaExceeded {
        /// Visits registered so far.
        visits_count: i32,
        /// The pass quota.
        max_visits: i32,
    },
}

impl From<PassError> for AppError {
    fn from(err: PassError) -> Self {
        match err {
            PassError::Invalid(_) => AppError::invalid_pass(err.to_string()),
            PassError::QuotaExceeded { .. } => AppError::quota_exceeded(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visitors_core::error::ErrorKind;

    #[test]
    fn test_invalid_messages() {
        assert_eq!(
            PassError::Invalid(InvalidPassReason::Inactive).to_string(),
            "Visitor pass is inactive"
        );
        assert_eq!(
            PassError::Invalid(InvalidPassReason::Expired).to_string(),
            "Visitor pass is expired"
        );
    }

    #[test]
    fn test_maps_to_app_error_kinds() {
        let invalid: AppError = PassError::Invalid(InvalidPassReason::Expired).into();
        assert_eq!(invalid.kind, ErrorKind::InvalidPass);

        let quota: AppError = PassError::QuotaExceeded {
            visits_count: 5,
            max_visits: 5,
        }
        .into();
        assert_eq!(quota.kind, ErrorKind::QuotaExceeded);
        assert!(quota.message.contains("5/5"));
    }
}
