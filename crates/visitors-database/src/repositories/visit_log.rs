//! Visit log repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use visitors_core::error::{AppError, ErrorKind};
use visitors_core::result::AppResult;
use visitors_core::types::{VisitLogId, VisitorPassId};
use visitors_entity::visit_log::{CreateVisitLog, VisitLog};

use crate::store::VisitLogStore;

/// PostgreSQL-backed [`VisitLogStore`].
#[derive(Debug, Clone)]
pub struct VisitLogRepository {
    pool: PgPool,
}

impl VisitLogRepository {
    /// Create a new visit log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete entries older than `before`. Returns the number removed.
    pub async fn purge_before(&self, before: chrono::DateTime<chrono::Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM visit_logs WHERE timestamp < $1")
            .bind(before)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to purge visit logs", e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl VisitLogStore for VisitLogRepository {
    async fn append(&self, entry: &CreateVisitLog) -> AppResult<VisitLog> {
        sqlx::query_as::<_, VisitLog>(
            "INSERT INTO visit_logs (id, pass_id, visits_snapshot, session_key, http_method, \
             request_uri, query_string, user_agent, referer, remote_addr, status_code, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(VisitLogId::new())
        .bind(entry.pass_id)
        .bind(entry.visits_snapshot)
        .bind(&entry.session_key)
        .bind(&entry.http_method)
        .bind(&entry.request_uri)
        .bind(&entry.query_string)
        .bind(&entry.user_agent)
        .bind(&entry.referer)
        .bind(&entry.remote_addr)
        .bind(entry.status_code)
        .bind(entry.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append visit log", e))
    }

    async fn list_for_pass(&self, pass_id: VisitorPassId, limit: i64) -> AppResult<Vec<VisitLog>> {
        sqlx::query_as::<_, VisitLog>(
            "SELECT * FROM visit_logs WHERE pass_id = $1 ORDER BY timestamp DESC LIMIT $2",
        )
        .bind(pass_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list visit logs", e))
    }

    async fn count_for_pass(&self, pass_id: VisitorPassId) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM visit_logs WHERE pass_id = $1")
            .bind(pass_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count visit logs", e))
    }
}
