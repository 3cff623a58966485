//! Shared test helpers for service tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use visitors_core::clock::{Clock, FixedClock};
use visitors_core::config::visitors::VisitorsConfig;
use visitors_core::result::AppResult;
use visitors_core::types::VisitorPassId;
use visitors_database::memory::{MemoryPassStore, MemoryVisitLogStore};
use visitors_database::store::PassStore;
use visitors_entity::pass::VisitorPass;
use visitors_service::{PassService, VisitLogService};

/// Test application context backed by in-memory stores.
pub struct TestApp {
    /// The service under test.
    pub service: PassService,
    /// Pass storage, for direct inspection.
    pub passes: MemoryPassStore,
    /// Log storage, for direct inspection.
    pub logs: MemoryVisitLogStore,
    /// The frozen clock driving the service.
    pub clock: Arc<FixedClock>,
}

impl TestApp {
    /// A service using default settings.
    pub fn new() -> Self {
        Self::with_settings(VisitorsConfig::default())
    }

    /// A service using `settings`.
    pub fn with_settings(settings: VisitorsConfig) -> Self {
        Self::build(settings, None)
    }

    /// A service whose first visit-count write is preceded by `interruption`.
    pub fn interrupted(interruption: Interruption) -> Self {
        Self::build(VisitorsConfig::default(), Some(interruption))
    }

    fn build(settings: VisitorsConfig, interruption: Option<Interruption>) -> Self {
        let passes = MemoryPassStore::new();
        let logs = MemoryVisitLogStore::new();
        let clock = Arc::new(FixedClock::new(start()));

        let store: Arc<dyn PassStore> = match interruption {
            Some(interruption) => Arc::new(InterruptedPassStore {
                inner: passes.clone(),
                pending: Mutex::new(Some(interruption)),
            }),
            None => Arc::new(passes.clone()),
        };

        let log_service = Arc::new(VisitLogService::new(Arc::new(logs.clone()), clock.clone()));
        let service = PassService::new(store, log_service, clock.clone(), settings);

        Self {
            service,
            passes,
            logs,
            clock,
        }
    }

    /// The current test time.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// The instant every test clock starts at.
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Something another caller does between a read and the visit-count write.
#[derive(Debug, Clone, Copy)]
pub enum Interruption {
    /// Another request takes one visit.
    TakeVisit,
    /// The pass is deleted.
    Delete,
}

/// Memory store that applies one [`Interruption`] before the first
/// compare-and-set reaches the inner store.
#[derive(Debug)]
struct InterruptedPassStore {
    inner: MemoryPassStore,
    pending: Mutex<Option<Interruption>>,
}

#[async_trait]
impl PassStore for InterruptedPassStore {
    async fn create(&self, pass: &VisitorPass) -> AppResult<VisitorPass> {
        self.inner.create(pass).await
    }

    async fn find_by_id(&self, id: VisitorPassId) -> AppResult<Option<VisitorPass>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Vec<VisitorPass>> {
        self.inner.find_by_email(email).await
    }

    async fn update(&self, pass: &VisitorPass) -> AppResult<Option<VisitorPass>> {
        self.inner.update(pass).await
    }

    async fn compare_and_set_visits(
        &self,
        id: VisitorPassId,
        expected: i32,
        new: i32,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let pending = self.pending.lock().unwrap().take();
        match pending {
            Some(Interruption::TakeVisit) => {
                self.inner
                    .compare_and_set_visits(id, expected, expected + 1, updated_at)
                    .await?;
            }
            Some(Interruption::Delete) => {
                self.inner.delete(id).await?;
            }
            None => {}
        }
        self.inner
            .compare_and_set_visits(id, expected, new, updated_at)
            .await
    }

    async fn reactivate(
        &self,
        id: VisitorPassId,
        expires_at: Option<DateTime<Utc>>,
        reset_visits: bool,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<VisitorPass>> {
        self.inner
            .reactivate(id, expires_at, reset_visits, updated_at)
            .await
    }

    async fn delete(&self, id: VisitorPassId) -> AppResult<bool> {
        self.inner.delete(id).await
    }
}
