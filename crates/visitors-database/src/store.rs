//! Persistence contracts for passes and visit logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use visitors_core::result::AppResult;
use visitors_core::types::VisitorPassId;
use visitors_entity::pass::VisitorPass;
use visitors_entity::visit_log::{CreateVisitLog, VisitLog};

/// Create/read/update/delete for visitor passes.
///
/// `visits_count` is written only through [`compare_and_set_visits`] and
/// [`reactivate`]; [`update`] leaves it alone so a concurrent visit is
/// never overwritten by a stale copy.
///
/// [`compare_and_set_visits`]: PassStore::compare_and_set_visits
/// [`reactivate`]: PassStore::reactivate
/// [`update`]: PassStore::update
#[async_trait]
pub trait PassStore: Send + Sync + std::fmt::Debug {
    /// Insert a new pass and return it as stored.
    async fn create(&self, pass: &VisitorPass) -> AppResult<VisitorPass>;

    /// Find a pass by id.
    async fn find_by_id(&self, id: VisitorPassId) -> AppResult<Option<VisitorPass>>;

    /// All passes issued to `email`, newest first.
    async fn find_by_email(&self, email: &str) -> AppResult<Vec<VisitorPass>>;

    /// Persist every field except `visits_count`. Returns the stored pass.
    async fn update(&self, pass: &VisitorPass) -> AppResult<Option<VisitorPass>>;

    /// Set `visits_count` to `new` only if it still equals `expected`.
    ///
    /// Returns `false` when another writer got there first (or the pass
    /// no longer exists).
    async fn compare_and_set_visits(
        &self,
        id: VisitorPassId,
        expected: i32,
        new: i32,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Set the pass active with a new expiry in one write, zeroing
    /// `visits_count` when `reset_visits` is set. Returns the stored pass.
    async fn reactivate(
        &self,
        id: VisitorPassId,
        expires_at: Option<DateTime<Utc>>,
        reset_visits: bool,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<VisitorPass>>;

    /// Delete a pass and its logs. Returns `true` if it existed.
    async fn delete(&self, id: VisitorPassId) -> AppResult<bool>;
}

/// Append-only storage for visit log entries.
#[async_trait]
pub trait VisitLogStore: Send + Sync + std::fmt::Debug {
    /// Append one entry.
    async fn append(&self, entry: &CreateVisitLog) -> AppResult<VisitLog>;

    /// Most recent entries for a pass, newest first.
    async fn list_for_pass(&self, pass_id: VisitorPassId, limit: i64) -> AppResult<Vec<VisitLog>>;

    /// Number of entries recorded for a pass.
    async fn count_for_pass(&self, pass_id: VisitorPassId) -> AppResult<i64>;
}
