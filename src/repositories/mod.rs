//! Persistence seams consumed by the services.
//!
//! Each trait has a PostgreSQL implementation in this module tree; the
//! services only ever see `Arc<dyn Trait>` so tests can swap in the
//! in-memory versions from [`memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::activity::ActivityEntry;
use crate::models::api_key::ApiKey;
use crate::models::brand::Brand;
use crate::models::domain::DomainRecord;
use crate::models::serp_run::RunResult;

pub mod activity_repo;
pub mod catalog_repo;
pub mod key_repo;
pub mod run_repo;

#[cfg(test)]
pub mod memory;

/// Brands and registered domains.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Active brands ordered by code.
    async fn find_active_brands(&self) -> Result<Vec<Brand>, AppError>;

    async fn find_brand(&self, id: Uuid) -> Result<Option<Brand>, AppError>;

    /// Active domains, each carrying its owning brand.
    async fn find_active_domains(&self) -> Result<Vec<DomainRecord>, AppError>;

    /// Active domain of `brand_id` registered under exactly this host and path.
    async fn find_active_domain(
        &self,
        brand_id: Uuid,
        host_key: &str,
        path_prefix: &str,
    ) -> Result<Option<DomainRecord>, AppError>;

    async fn insert_domain(&self, domain: &DomainRecord) -> Result<(), AppError>;

    /// Soft-deactivate a domain, returning it when it was active.
    async fn deactivate_domain(&self, id: Uuid) -> Result<Option<DomainRecord>, AppError>;
}

/// Provider API keys and the rotation cursor.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Every key, active or not, in registration order.
    async fn list_keys(&self) -> Result<Vec<ApiKey>, AppError>;

    async fn insert_keys(&self, keys: &[ApiKey]) -> Result<(), AppError>;

    async fn load_cursor(&self) -> Result<usize, AppError>;

    async fn save_cursor(&self, cursor: usize) -> Result<(), AppError>;

    /// Persist the mutable state of `key` after an attempt and log the
    /// attempt at `key.last_used_at`.
    async fn record_attempt(&self, key: &ApiKey, succeeded: bool) -> Result<(), AppError>;

    /// Attempts made with a key at or after `since`.
    async fn count_requests_since(&self, key_id: Uuid, since: DateTime<Utc>) -> Result<i64, AppError>;

    async fn set_baseline(
        &self,
        key_id: Uuid,
        remaining: i64,
        captured_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// Storage for auto-triggered runs.
#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn save_run(&self, run: &RunResult) -> Result<(), AppError>;
}

/// Activity log. Implementations must not fail the caller.
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, entry: ActivityEntry);
}
