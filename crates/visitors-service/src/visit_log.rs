//! Visit log recorder.

use std::sync::Arc;

use tracing::debug;

use visitors_core::clock::Clock;
use visitors_core::error::AppError;
use visitors_core::types::VisitorPassId;
use visitors_database::store::VisitLogStore;
use visitors_entity::pass::VisitorPass;
use visitors_entity::visit_log::{CreateVisitLog, RequestMeta, VisitLog};

/// Writes one immutable entry per request handled under a pass.
#[derive(Debug, Clone)]
pub struct VisitLogService {
    logs: Arc<dyn VisitLogStore>,
    clock: Arc<dyn Clock>,
}

impl VisitLogService {
    /// Creates a new visit log service.
    pub fn new(logs: Arc<dyn VisitLogStore>, clock: Arc<dyn Clock>) -> Self {
        Self { logs, clock }
    }

    /// Record `request` against `pass`, snapshotting its current visit count.
    pub async fn record(
        &self,
        pass: &VisitorPass,
        request: &RequestMeta,
        status_code: i32,
    ) -> Result<VisitLog, AppError> {
        let entry = CreateVisitLog::capture(
            pass.id,
            pass.visits_count,
            request,
            status_code,
            self.clock.now(),
        );
        let log = self.logs.append(&entry).await?;

        debug!(
            pass_id = %pass.id,
            visits = log.visits_snapshot,
            status_code,
            "Visit logged"
        );

        Ok(log)
    }

    /// Most recent entries for a pass.
    pub async fn list_for_pass(
        &self,
        pass_id: VisitorPassId,
        limit: i64,
    ) -> Result<Vec<VisitLog>, AppError> {
        self.logs.list_for_pass(pass_id, limit).await
    }

    /// Number of entries recorded for a pass.
    pub async fn count_for_pass(&self, pass_id: VisitorPassId) -> Result<i64, AppError> {
        self.logs.count_for_pass(pass_id).await
    }
}
