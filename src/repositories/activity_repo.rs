//! PostgreSQL activity log.

use async_trait::async_trait;

use crate::db::DbPool;
use crate::models::activity::ActivityEntry;
use crate::repositories::ActivitySink;

#[derive(Clone, Debug)]
pub struct PgActivityLog {
    pool: DbPool,
}

impl PgActivityLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivitySink for PgActivityLog {
    async fn record(&self, entry: ActivityEntry) {
        let result = sqlx::query(
            r#"
            INSERT INTO activity_log (action, domain, domain_host_key, brand_id, note, actor, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.action.as_str())
        .bind(&entry.domain)
        .bind(&entry.domain_host_key)
        .bind(entry.brand_id)
        .bind(&entry.note)
        .bind(entry.actor)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await;

        // Logging failures never propagate
        if let Err(e) = result {
            tracing::warn!("Failed to write activity log entry {}: {:?}", entry.action.as_str(), e);
        }
    }
}
