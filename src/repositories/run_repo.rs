//! PostgreSQL storage for auto-triggered check runs.

use async_trait::async_trait;
use sqlx::types::Json;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::serp_run::RunResult;
use crate::repositories::RunRepository;

#[derive(Clone, Debug)]
pub struct PgRunRepository {
    pool: DbPool,
}

impl PgRunRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunRepository for PgRunRepository {
    async fn save_run(&self, run: &RunResult) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO serp_runs (
                brand_id, query, trigger, checked_at, params,
                key_id, key_name, key_remaining,
                own_count, competitor_count, unknown_count, best_own_rank,
                results
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(run.brand.id)
        .bind(&run.query)
        .bind(run.trigger.as_str())
        .bind(run.checked_at)
        .bind(Json(&run.params))
        .bind(run.key_id)
        .bind(&run.key_name)
        .bind(run.key_remaining)
        .bind(run.summary.own_count as i32)
        .bind(run.summary.competitor_count as i32)
        .bind(run.summary.unknown_count as i32)
        .bind(run.summary.best_own_rank.map(|rank| rank as i32))
        .bind(Json(&run.results))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
