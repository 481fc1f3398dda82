//! PostgreSQL storage for provider API keys, the rotation cursor and the
//! per-attempt usage log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::api_key::ApiKey;
use crate::repositories::KeyStore;

#[derive(Clone, Debug)]
pub struct PgKeyStore {
    pool: DbPool,
}

impl PgKeyStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KeyStore for PgKeyStore {
    async fn list_keys(&self) -> Result<Vec<ApiKey>, AppError> {
        let keys = sqlx::query_as::<_, ApiKey>(
            r#"
            SELECT id, name, secret, is_active, last_used_at, last_error, exhausted_at,
                   last_known_remaining, total_requests, baseline_remaining,
                   baseline_captured_at, created_at
            FROM serp_api_keys
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn insert_keys(&self, keys: &[ApiKey]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for key in keys {
            sqlx::query(
                r#"
                INSERT INTO serp_api_keys (id, name, secret, is_active, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(key.id)
            .bind(&key.name)
            .bind(&key.secret)
            .bind(key.is_active)
            .bind(key.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    async fn load_cursor(&self) -> Result<usize, AppError> {
        let cursor: Option<i64> =
            sqlx::query_scalar("SELECT key_cursor FROM key_rotation_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(cursor.unwrap_or(0).max(0) as usize)
    }

    async fn save_cursor(&self, cursor: usize) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO key_rotation_state (id, key_cursor) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET key_cursor = EXCLUDED.key_cursor
            "#,
        )
        .bind(cursor as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_attempt(&self, key: &ApiKey, succeeded: bool) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE serp_api_keys
            SET last_used_at = $2,
                last_error = $3,
                exhausted_at = $4,
                last_known_remaining = $5,
                total_requests = $6
            WHERE id = $1
            "#,
        )
        .bind(key.id)
        .bind(key.last_used_at)
        .bind(&key.last_error)
        .bind(key.exhausted_at)
        .bind(key.last_known_remaining)
        .bind(key.total_requests)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO serp_api_key_usage (key_id, used_at, succeeded) VALUES ($1, $2, $3)",
        )
        .bind(key.id)
        .bind(key.last_used_at.unwrap_or_else(Utc::now))
        .bind(succeeded)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn count_requests_since(&self, key_id: Uuid, since: DateTime<Utc>) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM serp_api_key_usage WHERE key_id = $1 AND used_at >= $2",
        )
        .bind(key_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn set_baseline(
        &self,
        key_id: Uuid,
        remaining: i64,
        captured_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE serp_api_keys SET baseline_remaining = $2, baseline_captured_at = $3 WHERE id = $1",
        )
        .bind(key_id)
        .bind(remaining)
        .bind(captured_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
