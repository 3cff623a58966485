//! In-memory stores using a Tokio mutex for single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use visitors_core::error::AppError;
use visitors_core::result::AppResult;
use visitors_core::types::VisitorPassId;
use visitors_entity::pass::VisitorPass;
use visitors_entity::visit_log::{CreateVisitLog, VisitLog};

use crate::store::{PassStore, VisitLogStore};

/// In-memory [`PassStore`].
///
/// Every operation runs under one mutex, so the compare-and-set on
/// `visits_count` is atomic with respect to all other writers.
#[derive(Debug, Clone, Default)]
pub struct MemoryPassStore {
    passes: Arc<Mutex<HashMap<VisitorPassId, VisitorPass>>>,
}

impl MemoryPassStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored passes.
    pub async fn len(&self) -> usize {
        self.passes.lock().await.len()
    }

    /// Whether the store holds no passes.
    pub async fn is_empty(&self) -> bool {
        self.passes.lock().await.is_empty()
    }
}

#[async_trait]
impl PassStore for MemoryPassStore {
    async fn create(&self, pass: &VisitorPass) -> AppResult<VisitorPass> {
        let mut passes = self.passes.lock().await;
        if passes.contains_key(&pass.id) {
            return Err(AppError::conflict(format!(
                "Visitor pass {} already exists",
                pass.id
            )));
        }
        passes.insert(pass.id, pass.clone());
        Ok(pass.clone())
    }

    async fn find_by_id(&self, id: VisitorPassId) -> AppResult<Option<VisitorPass>> {
        Ok(self.passes.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Vec<VisitorPass>> {
        let passes = self.passes.lock().await;
        let mut found: Vec<VisitorPass> = passes
            .values()
            .filter(|p| p.email == email)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn update(&self, pass: &VisitorPass) -> AppResult<Option<VisitorPass>> {
        let mut passes = self.passes.lock().await;
        let Some(stored) = passes.get_mut(&pass.id) else {
            return Ok(None);
        };
        let visits_count = stored.visits_count;
        *stored = pass.clone();
        stored.visits_count = visits_count;
        Ok(Some(stored.clone()))
    }

    async fn compare_and_set_visits(
        &self,
        id: VisitorPassId,
        expected: i32,
        new: i32,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut passes = self.passes.lock().await;
        match passes.get_mut(&id) {
            Some(stored) if stored.visits_count == expected => {
                stored.visits_count = new;
                stored.last_updated_at = updated_at;
                Ok(true)
            }
            Some(stored) => {
                debug!(
                    pass_id = %id,
                    expected,
                    actual = stored.visits_count,
                    "Visit count changed underneath"
                );
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn reactivate(
        &self,
        id: VisitorPassId,
        expires_at: Option<DateTime<Utc>>,
        reset_visits: bool,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<VisitorPass>> {
        let mut passes = self.passes.lock().await;
        Ok(passes.get_mut(&id).map(|stored| {
            stored.is_active = true;
            stored.expires_at = expires_at;
            if reset_visits {
                stored.visits_count = 0;
            }
            stored.last_updated_at = updated_at;
            stored.clone()
        }))
    }

    async fn delete(&self, id: VisitorPassId) -> AppResult<bool> {
        Ok(self.passes.lock().await.remove(&id).is_some())
    }
}

/// In-memory [`VisitLogStore`].
///
/// Entries are kept in insertion order. Deleting a pass from a
/// [`MemoryPassStore`] does not remove its entries here.
#[derive(Debug, Clone, Default)]
pub struct MemoryVisitLogStore {
    entries: Arc<Mutex<Vec<VisitLog>>>,
}

impl MemoryVisitLogStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry recorded, oldest first.
    pub async fn all(&self) -> Vec<VisitLog> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl VisitLogStore for MemoryVisitLogStore {
    async fn append(&self, entry: &CreateVisitLog) -> AppResult<VisitLog> {
        let log = entry.clone().into_entry();
        self.entries.lock().await.push(log.clone());
        Ok(log)
    }

    async fn list_for_pass(&self, pass_id: VisitorPassId, limit: i64) -> AppResult<Vec<VisitLog>> {
        let entries = self.entries.lock().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(entries
            .iter()
            .rev()
            .filter(|e| e.pass_id == pass_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_for_pass(&self, pass_id: VisitorPassId) -> AppResult<i64> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().filter(|e| e.pass_id == pass_id).count() as i64)
    }
}
