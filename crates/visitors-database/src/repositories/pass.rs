//! Visitor pass repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use visitors_core::error::{AppError, ErrorKind};
use visitors_core::result::AppResult;
use visitors_core::types::VisitorPassId;
use visitors_entity::pass::VisitorPass;

use crate::store::PassStore;

/// PostgreSQL-backed [`PassStore`].
#[derive(Debug, Clone)]
pub struct PassRepository {
    pool: PgPool,
}

impl PassRepository {
    /// Create a new pass repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Passes for a scope, newest first.
    pub async fn find_by_scope(&self, scope: &str, limit: i64) -> AppResult<Vec<VisitorPass>> {
        sqlx::query_as::<_, VisitorPass>(
            "SELECT * FROM visitor_passes WHERE scope = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(scope)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list passes by scope", e))
    }
}

#[async_trait]
impl PassStore for PassRepository {
    async fn create(&self, pass: &VisitorPass) -> AppResult<VisitorPass> {
        sqlx::query_as::<_, VisitorPass>(
            "INSERT INTO visitor_passes (id, first_name, last_name, email, scope, created_at, \
             context, last_updated_at, expires_at, is_active, visits_count, max_visits) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
        )
        .bind(pass.id)
        .bind(&pass.first_name)
        .bind(&pass.last_name)
        .bind(&pass.email)
        .bind(&pass.scope)
        .bind(pass.created_at)
        .bind(&pass.context)
        .bind(pass.last_updated_at)
        .bind(pass.expires_at)
        .bind(pass.is_active)
        .bind(pass.visits_count)
        .bind(pass.max_visits)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create visitor pass", e))
    }

    async fn find_by_id(&self, id: VisitorPassId) -> AppResult<Option<VisitorPass>> {
        sqlx::query_as::<_, VisitorPass>("SELECT * FROM visitor_passes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find visitor pass", e))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Vec<VisitorPass>> {
        sqlx::query_as::<_, VisitorPass>(
            "SELECT * FROM visitor_passes WHERE email = $1 ORDER BY created_at DESC",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list passes by email", e)
        })
    }

    async fn update(&self, pass: &VisitorPass) -> AppResult<Option<VisitorPass>> {
        sqlx::query_as::<_, VisitorPass>(
            "UPDATE visitor_passes SET first_name = $2, last_name = $3, email = $4, scope = $5, \
             context = $6, last_updated_at = $7, expires_at = $8, is_active = $9, max_visits = $10 \
             WHERE id = $1 RETURNING *",
        )
        .bind(pass.id)
        .bind(&pass.first_name)
        .bind(&pass.last_name)
        .bind(&pass.email)
        .bind(&pass.scope)
        .bind(&pass.context)
        .bind(pass.last_updated_at)
        .bind(pass.expires_at)
        .bind(pass.is_active)
        .bind(pass.max_visits)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update visitor pass", e))
    }

    async fn compare_and_set_visits(
        &self,
        id: VisitorPassId,
        expected: i32,
        new: i32,
        updated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE visitor_passes SET visits_count = $3, last_updated_at = $4 \
             WHERE id = $1 AND visits_count = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(new)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update visit count", e))?;

        let applied = result.rows_affected() == 1;
        debug!(pass_id = %id, expected, new, applied, "Visit count compare-and-set");
        Ok(applied)
    }

    async fn reactivate(
        &self,
        id: VisitorPassId,
        expires_at: Option<DateTime<Utc>>,
        reset_visits: bool,
        updated_at: DateTime<Utc>,
    ) -> AppResult<Option<VisitorPass>> {
        sqlx::query_as::<_, VisitorPass>(
            "UPDATE visitor_passes SET is_active = TRUE, expires_at = $2, \
             visits_count = CASE WHEN $3 THEN 0 ELSE visits_count END, last_updated_at = $4 \
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(expires_at)
        .bind(reset_visits)
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to reactivate visitor pass", e)
        })
    }

    async fn delete(&self, id: VisitorPassId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM visitor_passes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete visitor pass", e)
            })?;
        Ok(result.rows_affected() > 0)
    }
}
