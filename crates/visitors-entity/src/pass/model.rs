//! Visitor pass entity model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use visitors_core::config::visitors::VisitorsConfig;
use visitors_core::types::VisitorPassId;

use super::error::{InvalidPassReason, PassError};
use super::token::tokenise_url;

/// A temporary visitor, somewhere between anonymous and authenticated.
///
/// Validity is never stored. It is recomputed from `is_active`,
/// `expires_at` and the visit quota against the time supplied by the
/// caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct VisitorPass {
    /// Opaque pass identifier, also the URL token.
    pub id: VisitorPassId,
    /// Holder's first name.
    pub first_name: String,
    /// Holder's last name.
    pub last_name: String,
    /// Holder's email address.
    pub email: String,
    /// Label the caller uses to decide what the pass grants.
    pub scope: String,
    /// When the pass was created.
    pub created_at: DateTime<Utc>,
    /// Arbitrary caller data, never inspected here.
    pub context: Option<serde_json::Value>,
    /// Last mutation time.
    pub last_updated_at: DateTime<Utc>,
    /// After this instant the pass can no longer be used. `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
    /// `false` once the pass has been revoked.
    pub is_active: bool,
    /// Visits registered so far.
    pub visits_count: i32,
    /// Visit quota.
    pub max_visits: i32,
}

/// How `expires_at` is set when a pass is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "at")]
pub enum Expiry {
    /// `created_at` plus the configured token lifetime.
    #[default]
    Default,
    /// An explicit instant.
    At(DateTime<Utc>),
    /// The pass never time-expires.
    Never,
}

impl From<Option<DateTime<Utc>>> for Expiry {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Default, Self::At)
    }
}

/// Data required to create a new visitor pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateVisitorPass {
    /// Explicit identifier; a fresh one is generated when absent.
    pub id: Option<VisitorPassId>,
    /// Holder's first name.
    #[validate(length(max = 150))]
    #[serde(default)]
    pub first_name: String,
    /// Holder's last name.
    #[validate(length(max = 150))]
    #[serde(default)]
    pub last_name: String,
    /// Holder's email address.
    #[validate(email)]
    pub email: String,
    /// Scope label.
    #[validate(length(min = 1, max = 100))]
    pub scope: String,
    /// Explicit creation time, `now` when absent.
    pub created_at: Option<DateTime<Utc>>,
    /// Expiry policy.
    #[serde(default)]
    pub expires: Expiry,
    /// Active flag, `true` when absent.
    pub is_active: Option<bool>,
    /// Starting visit count, `0` when absent.
    #[validate(range(min = 0))]
    pub visits_count: Option<i32>,
    /// Visit quota, the configured default when absent.
    #[validate(range(min = 0))]
    pub max_visits: Option<i32>,
    /// Arbitrary caller data.
    pub context: Option<serde_json::Value>,
}

impl CreateVisitorPass {
    /// Minimal request: everything else takes its default.
    pub fn new(email: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            scope: scope.into(),
            ..Default::default()
        }
    }
}

/// The template-safe view of a pass.
///
/// Timestamps and the active flag are left out on purpose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassSnapshot {
    /// Pass id as text.
    pub uuid: String,
    /// Holder's first name.
    pub first_name: String,
    /// Holder's last name.
    pub last_name: String,
    /// `first_name + " " + last_name`.
    pub full_name: String,
    /// Holder's email.
    pub email: String,
    /// Scope label.
    pub scope: String,
    /// Caller context.
    pub context: Option<serde_json::Value>,
    /// Visit quota.
    pub max_visits: i32,
    /// Visits registered so far.
    pub visits_count: i32,
}

impl VisitorPass {
    /// Build a pass, filling defaults from `settings`.
    ///
    /// The default expiry is computed here, once, from `created_at`.
    pub fn new(data: CreateVisitorPass, settings: &VisitorsConfig, now: DateTime<Utc>) -> Self {
        let created_at = data.created_at.unwrap_or(now);
        let expires_at = match data.expires {
            Expiry::Default => Some(expiry_after(created_at, settings)),
            Expiry::At(at) => Some(at),
            Expiry::Never => None,
        };

        Self {
            id: data.id.unwrap_or_default(),
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            scope: data.scope,
            created_at,
            context: data.context,
            last_updated_at: now,
            expires_at,
            is_active: data.is_active.unwrap_or(true),
            visits_count: data.visits_count.unwrap_or(0),
            max_visits: data.max_visits.unwrap_or(settings.default_max_visits),
        }
    }

    /// First and last name joined by a single space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The value a caller stores in its session to remember this pass.
    pub fn session_data(&self) -> String {
        self.id.to_string()
    }

    /// Whether `expires_at` is strictly before `now`.
    pub fn has_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now,
            None => false,
        }
    }

    /// Active, unexpired and under quota.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.has_expired(now) && self.visits_count < self.max_visits
    }

    /// Visits left before the quota is reached.
    pub fn remaining_visits(&self) -> i32 {
        (self.max_visits - self.visits_count).max(0)
    }

    /// Check the activation and expiry dimensions only.
    ///
    /// The visit quota is not considered; that is reported separately by
    /// [`register_visit`](Self::register_visit).
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), PassError> {
        if !self.is_active {
            return Err(PassError::Invalid(InvalidPassReason::Inactive));
        }
        if self.has_expired(now) {
            return Err(PassError::Invalid(InvalidPassReason::Expired));
        }
        Ok(())
    }

    /// Count one visit against the quota and return the new count.
    ///
    /// Leaves the pass untouched when the quota is already used up. Does
    /// not look at activation or expiry.
    pub fn register_visit(&mut self, now: DateTime<Utc>) -> Result<i32, PassError> {
        if self.visits_count >= self.max_visits {
            return Err(PassError::QuotaExceeded {
                visits_count: self.visits_count,
                max_visits: self.max_visits,
            });
        }
        self.visits_count += 1;
        self.last_updated_at = now;
        Ok(self.visits_count)
    }

    /// Revoke the pass. Idempotent.
    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.is_active = false;
        self.last_updated_at = now;
    }

    /// Re-enable the pass with a fresh expiry window.
    ///
    /// The visit count is reset only when `settings.reactivate_resets_visits`
    /// is set, so a quota-exhausted pass may stay invalid after this.
    pub fn reactivate(&mut self, settings: &VisitorsConfig, now: DateTime<Utc>) {
        self.is_active = true;
        self.expires_at = Some(expiry_after(now, settings));
        if settings.reactivate_resets_visits {
            self.visits_count = 0;
        }
        self.last_updated_at = now;
    }

    /// Return `url` with `key` set to this pass id in its querystring.
    pub fn tokenise(&self, url: &str, key: &str) -> String {
        tokenise_url(url, key, &self.id)
    }

    /// Template-safe view of the pass.
    pub fn serialize(&self) -> PassSnapshot {
        PassSnapshot {
            uuid: self.id.to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name(),
            email: self.email.clone(),
            scope: self.scope.clone(),
            context: self.context.clone(),
            max_visits: self.max_visits,
            visits_count: self.visits_count,
        }
    }
}

/// `start` plus the configured lifetime, clamped to the latest representable instant.
fn expiry_after(start: DateTime<Utc>, settings: &VisitorsConfig) -> DateTime<Utc> {
    start
        .checked_add_signed(settings.token_expiry())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl fmt::Display for VisitorPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Visitor pass for {} ({})", self.email, self.scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const TEST_UUID: &str = "68201321-9dd2-4fb3-92b1-24367f38a7d6";

    fn today() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn tomorrow() -> DateTime<Utc> {
        today() + Duration::days(1)
    }

    fn yesterday() -> DateTime<Utc> {
        today() - Duration::days(1)
    }

    fn settings() -> VisitorsConfig {
        VisitorsConfig::default()
    }

    fn pass_with(is_active: bool, expires: Expiry) -> VisitorPass {
        let data = CreateVisitorPass {
            is_active: Some(is_active),
            expires,
            ..CreateVisitorPass::new("foo@bar.com", "docs")
        };
        VisitorPass::new(data, &settings(), today())
    }

    fn pass_with_visits(visits_count: i32, max_visits: i32) -> VisitorPass {
        let data = CreateVisitorPass {
            expires: Expiry::At(tomorrow()),
            visits_count: Some(visits_count),
            max_visits: Some(max_visits),
            ..CreateVisitorPass::new("foo@bar.com", "docs")
        };
        VisitorPass::new(data, &settings(), today())
    }

    #[test]
    fn test_defaults() {
        let config = settings();
        let pass = VisitorPass::new(CreateVisitorPass::new("foo@bar.com", "docs"), &config, today());
        assert_eq!(pass.created_at, today());
        assert_eq!(pass.expires_at, Some(pass.created_at + config.token_expiry()));
        assert!(pass.is_active);
        assert_eq!(pass.visits_count, 0);
        assert_eq!(pass.max_visits, config.default_max_visits);
    }

    #[test]
    fn test_default_expiry_follows_explicit_created_at() {
        let config = settings();
        let data = CreateVisitorPass {
            created_at: Some(yesterday()),
            ..CreateVisitorPass::new("foo@bar.com", "docs")
        };
        let pass = VisitorPass::new(data, &config, today());
        assert_eq!(pass.expires_at, Some(yesterday() + config.token_expiry()));
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let id: VisitorPassId = TEST_UUID.parse().unwrap();
        let data = CreateVisitorPass {
            id: Some(id),
            ..CreateVisitorPass::new("foo@bar.com", "docs")
        };
        let pass = VisitorPass::new(data, &settings(), today());
        assert_eq!(pass.id, id);
        assert_eq!(pass.session_data(), TEST_UUID);
    }

    #[test]
    fn test_has_expired() {
        let cases = [
            (Some(tomorrow()), false),
            (Some(yesterday()), true),
            (Some(today()), false),
            (None, false),
        ];
        for (expires_at, expected) in cases {
            let mut pass = pass_with(true, Expiry::Default);
            pass.expires_at = expires_at;
            assert_eq!(pass.has_expired(today()), expected, "expires_at={expires_at:?}");
        }
    }

    #[test]
    fn test_is_valid() {
        let cases = [
            (true, Expiry::At(tomorrow()), true),
            (false, Expiry::At(tomorrow()), false),
            (false, Expiry::At(yesterday()), false),
            (true, Expiry::At(yesterday()), false),
            (true, Expiry::Never, true),
            (false, Expiry::Never, false),
        ];
        for (is_active, expires, expected) in cases {
            let pass = pass_with(is_active, expires);
            assert_eq!(pass.is_valid(today()), expected, "{is_active} {expires:?}");
        }
    }

    #[test]
    fn test_is_valid_recomputed_as_time_passes() {
        let pass = pass_with(true, Expiry::At(tomorrow()));
        assert!(pass.is_valid(today()));
        assert!(!pass.is_valid(tomorrow() + Duration::seconds(1)));
    }

    #[test]
    fn test_validate() {
        let cases = [
            (true, tomorrow(), None),
            (false, tomorrow(), Some(InvalidPassReason::Inactive)),
            (false, yesterday(), Some(InvalidPassReason::Inactive)),
            (true, yesterday(), Some(InvalidPassReason::Expired)),
        ];
        for (is_active, expires_at, reason) in cases {
            let pass = pass_with(is_active, Expiry::At(expires_at));
            assert_eq!(pass.is_active, is_active);
            assert_eq!(pass.has_expired(today()), expires_at < today());
            match reason {
                None => assert!(pass.validate(today()).is_ok()),
                Some(reason) => {
                    assert_eq!(pass.validate(today()), Err(PassError::Invalid(reason)))
                }
            }
        }
    }

    #[test]
    fn test_validate_ignores_quota() {
        let pass = pass_with_visits(5, 5);
        assert!(pass.validate(today()).is_ok());
        assert!(!pass.is_valid(today()));
    }

    #[test]
    fn test_register_visit_at_quota_does_not_mutate() {
        let mut pass = pass_with_visits(5, 5);
        let before = pass.clone();
        let err = pass.register_visit(tomorrow()).unwrap_err();
        assert_eq!(
            err,
            PassError::QuotaExceeded {
                visits_count: 5,
                max_visits: 5
            }
        );
        assert_eq!(pass, before);
    }

    #[test]
    fn test_register_visit_below_quota() {
        let mut pass = pass_with_visits(4, 5);
        assert!(pass.is_valid(today()));
        assert_eq!(pass.register_visit(today()), Ok(5));
        assert_eq!(pass.visits_count, 5);
        assert!(!pass.is_valid(today()));
    }

    #[test]
    fn test_visits_limit() {
        for (visits_count, max_visits) in [(0, 10), (5, 5), (6, 5), (4, 5)] {
            let mut pass = pass_with_visits(visits_count, max_visits);
            if pass.is_valid(today()) {
                assert!(pass.register_visit(today()).is_ok());
            } else {
                assert!(matches!(
                    pass.register_visit(today()),
                    Err(PassError::QuotaExceeded { .. })
                ));
            }
        }
    }

    #[test]
    fn test_register_visit_ignores_activation() {
        let mut pass = pass_with_visits(0, 5);
        pass.deactivate(today());
        assert_eq!(pass.register_visit(today()), Ok(1));
    }

    #[test]
    fn test_zero_quota_is_always_denied() {
        let mut pass = pass_with_visits(0, 0);
        assert!(!pass.is_valid(today()));
        assert!(pass.register_visit(today()).is_err());
        assert_eq!(pass.remaining_visits(), 0);
    }

    #[test]
    fn test_deactivate_is_idempotent() {
        let mut pass = pass_with(true, Expiry::Default);
        pass.deactivate(today());
        pass.deactivate(tomorrow());
        assert!(!pass.is_active);
        assert_eq!(pass.last_updated_at, tomorrow());
    }

    #[test]
    fn test_reactivate_resets_visits() {
        let config = VisitorsConfig {
            reactivate_resets_visits: true,
            ..settings()
        };
        let mut pass = pass_with(false, Expiry::At(yesterday()));
        pass.visits_count = pass.max_visits;
        assert!(!pass.is_active);
        assert!(pass.has_expired(today()));
        assert!(!pass.is_valid(today()));

        pass.reactivate(&config, today());
        assert!(pass.is_active);
        assert!(!pass.has_expired(today()));
        assert_eq!(pass.visits_count, 0);
        assert_eq!(pass.expires_at, Some(today() + config.token_expiry()));
        assert!(pass.is_valid(today()));
    }

    #[test]
    fn test_reactivate_keeps_visits() {
        let config = VisitorsConfig {
            reactivate_resets_visits: false,
            ..settings()
        };
        let mut pass = pass_with(false, Expiry::At(yesterday()));
        pass.visits_count = pass.max_visits;

        pass.reactivate(&config, today());
        assert!(pass.is_active);
        assert!(!pass.has_expired(today()));
        assert_eq!(pass.visits_count, pass.max_visits);
        assert!(!pass.is_valid(today()));
    }

    #[test]
    fn test_reactivate_refreshes_never_expiring_pass() {
        let config = settings();
        let mut pass = pass_with(true, Expiry::Never);
        pass.reactivate(&config, today());
        assert_eq!(pass.expires_at, Some(today() + config.token_expiry()));
    }

    #[test]
    fn test_serialize() {
        let data = CreateVisitorPass {
            first_name: "Fred".to_string(),
            context: Some(serde_json::json!({"order": 42})),
            ..CreateVisitorPass::new("fred@example.com", "orders")
        };
        let pass = VisitorPass::new(data, &settings(), today());
        let snapshot = pass.serialize();
        assert_eq!(snapshot.uuid, pass.id.to_string());
        assert_eq!(snapshot.full_name, "Fred ");
        assert_eq!(snapshot.context, Some(serde_json::json!({"order": 42})));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("expires_at").is_none());
        assert!(json.get("is_active").is_none());
    }

    #[test]
    fn test_oversized_lifetime_clamps_instead_of_overflowing() {
        let config = VisitorsConfig {
            default_token_expiry_seconds: i64::MAX / 2,
            ..settings()
        };
        let mut pass =
            VisitorPass::new(CreateVisitorPass::new("foo@bar.com", "docs"), &config, today());
        assert_eq!(pass.expires_at, Some(DateTime::<Utc>::MAX_UTC));
        assert!(!pass.has_expired(today()));

        pass.deactivate(today());
        pass.reactivate(&config, tomorrow());
        assert_eq!(pass.expires_at, Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn test_display() {
        let pass = pass_with(true, Expiry::Default);
        assert_eq!(pass.to_string(), "Visitor pass for foo@bar.com (docs)");
    }

    #[test]
    fn test_create_request_validation() {
        assert!(CreateVisitorPass::new("foo@bar.com", "docs").validate().is_ok());
        assert!(CreateVisitorPass::new("not-an-email", "docs").validate().is_err());
        assert!(CreateVisitorPass::new("foo@bar.com", "").validate().is_err());
    }
}
