//! Visitor pass lifecycle service.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use validator::Validate;

use visitors_core::clock::Clock;
use visitors_core::config::visitors::VisitorsConfig;
use visitors_core::error::AppError;
use visitors_core::types::VisitorPassId;
use visitors_database::store::PassStore;
use visitors_entity::pass::{CreateVisitorPass, VisitorPass, extract_token};
use visitors_entity::visit_log::RequestMeta;

use crate::visit_log::VisitLogService;

/// Status recorded for a request that was let through.
pub const STATUS_ADMITTED: i32 = 200;
/// Status recorded for a request that was turned away.
pub const STATUS_DENIED: i32 = 403;

/// Result of one attempt to take a visit.
enum Claim {
    /// The visit was counted; the pass as stored afterwards.
    Admitted(VisitorPass),
    /// The pass that was evaluated and the rejection it produced.
    Denied(VisitorPass, AppError),
}

/// Creates, validates and mutates visitor passes.
///
/// Settings sit behind a lock and are read on every call, so
/// [`update_settings`](Self::update_settings) affects the next operation.
#[derive(Debug, Clone)]
pub struct PassService {
    passes: Arc<dyn PassStore>,
    logs: Arc<VisitLogService>,
    clock: Arc<dyn Clock>,
    settings: Arc<RwLock<VisitorsConfig>>,
}

impl PassService {
    /// Creates a new pass service.
    pub fn new(
        passes: Arc<dyn PassStore>,
        logs: Arc<VisitLogService>,
        clock: Arc<dyn Clock>,
        settings: VisitorsConfig,
    ) -> Self {
        Self {
            passes,
            logs,
            clock,
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// The settings currently in force.
    pub async fn settings(&self) -> VisitorsConfig {
        self.settings.read().await.clone()
    }

    /// Replace the settings used by subsequent calls.
    pub async fn update_settings(&self, settings: VisitorsConfig) -> Result<(), AppError> {
        settings.check()?;
        *self.settings.write().await = settings;
        info!("Visitor pass settings updated");
        Ok(())
    }

    /// Issue a new pass.
    pub async fn create(&self, req: CreateVisitorPass) -> Result<VisitorPass, AppError> {
        req.validate()
            .map_err(|e| AppError::validation(format!("Invalid visitor pass: {e}")))?;

        let settings = self.settings().await;
        let pass = VisitorPass::new(req, &settings, self.clock.now());
        let pass = self.passes.create(&pass).await?;

        info!(
            pass_id = %pass.id,
            scope = %pass.scope,
            max_visits = pass.max_visits,
            expires_at = ?pass.expires_at,
            "Visitor pass created"
        );

        Ok(pass)
    }

    /// Look a pass up by id.
    pub async fn get(&self, id: VisitorPassId) -> Result<VisitorPass, AppError> {
        self.passes
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Visitor pass {id} not found")))
    }

    /// Look up the pass whose token is carried in `url`.
    pub async fn find_by_url(&self, url: &str) -> Result<VisitorPass, AppError> {
        let key = self.settings.read().await.querystring_key.clone();
        let id = extract_token(url, &key)
            .ok_or_else(|| AppError::not_found("No visitor pass token in URL"))?;
        self.get(id).await
    }

    /// All passes issued to `email`, newest first.
    pub async fn list_by_email(&self, email: &str) -> Result<Vec<VisitorPass>, AppError> {
        self.passes.find_by_email(email).await
    }

    /// Check activation and expiry. The visit quota is not considered.
    pub async fn validate(&self, id: VisitorPassId) -> Result<VisitorPass, AppError> {
        let pass = self.get(id).await?;
        pass.validate(self.clock.now())?;
        Ok(pass)
    }

    /// Count one visit against the pass quota.
    ///
    /// The increment is a compare-and-set on the stored count. A lost race
    /// re-reads the pass and checks the quota again, so two concurrent
    /// callers can never both take the last visit.
    pub async fn register_visit(&self, id: VisitorPassId) -> Result<VisitorPass, AppError> {
        match self.claim_visit(id, false).await? {
            Claim::Admitted(pass) => Ok(pass),
            Claim::Denied(_, err) => Err(err),
        }
    }

    /// Full admission flow for one request.
    ///
    /// Validates the pass, registers a visit and appends a log entry. A
    /// denied request is logged too, against the pass as last evaluated,
    /// before the error is returned. A missing pass is not logged.
    pub async fn admit(
        &self,
        id: VisitorPassId,
        request: &RequestMeta,
    ) -> Result<VisitorPass, AppError> {
        match self.claim_visit(id, true).await? {
            Claim::Admitted(visited) => {
                self.logs.record(&visited, request, STATUS_ADMITTED).await?;
                info!(pass_id = %id, visits = visited.visits_count, "Visitor admitted");
                Ok(visited)
            }
            Claim::Denied(pass, err) => {
                self.logs.record(&pass, request, STATUS_DENIED).await?;
                info!(pass_id = %id, visits = pass.visits_count, reason = %err, "Visitor denied");
                Err(err)
            }
        }
    }

    /// Read, check and increment until the compare-and-set applies.
    ///
    /// Each attempt works on a fresh read; a denial carries the copy it was
    /// decided on. `check_validity` adds the activation and expiry check.
    async fn claim_visit(
        &self,
        id: VisitorPassId,
        check_validity: bool,
    ) -> Result<Claim, AppError> {
        let retries = self.settings.read().await.visit_update_retries;

        for attempt in 0..=retries {
            let current = self.get(id).await?;
            let now = self.clock.now();

            if check_validity {
                if let Err(err) = current.validate(now) {
                    return Ok(Claim::Denied(current, err.into()));
                }
            }

            let mut visited = current.clone();
            if let Err(err) = visited.register_visit(now) {
                warn!(pass_id = %id, visits = current.visits_count, "Visit quota exceeded");
                return Ok(Claim::Denied(current, err.into()));
            }

            if self
                .passes
                .compare_and_set_visits(id, current.visits_count, visited.visits_count, now)
                .await?
            {
                debug!(pass_id = %id, visits = visited.visits_count, "Visit registered");
                return Ok(Claim::Admitted(visited));
            }

            debug!(pass_id = %id, attempt, "Visit count changed concurrently, retrying");
        }

        Err(AppError::conflict(format!(
            "Visit count for pass {id} kept changing; gave up after {retries} retries"
        )))
    }

    /// Revoke a pass. Idempotent.
    pub async fn deactivate(&self, id: VisitorPassId) -> Result<VisitorPass, AppError> {
        let mut pass = self.get(id).await?;
        pass.deactivate(self.clock.now());
        let pass = self.persist(&pass).await?;

        info!(pass_id = %id, "Visitor pass deactivated");
        Ok(pass)
    }

    /// Re-enable a pass with a fresh expiry window.
    pub async fn reactivate(&self, id: VisitorPassId) -> Result<VisitorPass, AppError> {
        let settings = self.settings().await;
        let now = self.clock.now();

        let mut pass = self.get(id).await?;
        pass.reactivate(&settings, now);
        let pass = self
            .passes
            .reactivate(id, pass.expires_at, settings.reactivate_resets_visits, now)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Visitor pass {id} not found")))?;

        info!(
            pass_id = %id,
            expires_at = ?pass.expires_at,
            visits_reset = settings.reactivate_resets_visits,
            "Visitor pass reactivated"
        );
        Ok(pass)
    }

    /// `url` with this pass's token in the configured querystring key.
    pub async fn tokenise(&self, id: VisitorPassId, url: &str) -> Result<String, AppError> {
        let pass = self.get(id).await?;
        let key = self.settings.read().await.querystring_key.clone();
        Ok(pass.tokenise(url, &key))
    }

    /// Delete a pass and its visit logs.
    pub async fn delete(&self, id: VisitorPassId) -> Result<(), AppError> {
        if !self.passes.delete(id).await? {
            return Err(AppError::not_found(format!("Visitor pass {id} not found")));
        }
        info!(pass_id = %id, "Visitor pass deleted");
        Ok(())
    }

    /// The visit log service this pass service writes to.
    pub fn logs(&self) -> &VisitLogService {
        &self.logs
    }

    async fn persist(&self, pass: &VisitorPass) -> Result<VisitorPass, AppError> {
        self.passes
            .update(pass)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Visitor pass {} not found", pass.id)))
    }
}
