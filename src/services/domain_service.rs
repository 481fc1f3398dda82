//! Domain registration.
//!
//! Registered domains are the catalog the classifier matches against. Every
//! add and delete is mirrored into the activity log.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::activity::{ActivityAction, ActivityEntry};
use crate::models::brand::BrandRef;
use crate::models::domain::DomainRecord;
use crate::repositories::{ActivitySink, CatalogRepository};

pub struct DomainService {
    catalog: Arc<dyn CatalogRepository>,
    activity: Arc<dyn ActivitySink>,
}

impl DomainService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, activity: Arc<dyn ActivitySink>) -> Self {
        Self { catalog, activity }
    }

    /// Register `raw` (bare domain or URL) for a brand.
    ///
    /// # Errors
    ///
    /// - `BrandNotFound`: unknown or inactive brand
    /// - `InvalidRequest`: `raw` has no usable host, or the brand already
    ///   has an active domain with the same host and path
    pub async fn register_domain(
        &self,
        brand_id: Uuid,
        raw: &str,
        note: &str,
        actor: Option<Uuid>,
    ) -> Result<DomainRecord, AppError> {
        let brand = self
            .catalog
            .find_brand(brand_id)
            .await?
            .filter(|brand| brand.is_active)
            .ok_or(AppError::BrandNotFound)?;

        let record = DomainRecord::derive(Uuid::new_v4(), raw, BrandRef::from(&brand), true)
            .with_note(note.trim());
        if record.host_key().is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "Not a valid domain or URL: {}",
                raw.trim()
            )));
        }

        let existing = self
            .catalog
            .find_active_domain(brand.id, record.host_key(), record.path_prefix())
            .await?;
        if existing.is_some() {
            return Err(AppError::InvalidRequest(format!(
                "Domain already registered for {}: {}",
                brand.code, record.domain
            )));
        }

        self.catalog.insert_domain(&record).await?;

        let mut entry = ActivityEntry::new(ActivityAction::Add)
            .with_note(record.note.clone())
            .with_metadata(json!({ "path_prefix": record.path_prefix() }));
        entry.domain = record.domain.clone();
        entry.domain_host_key = record.host_key().to_string();
        entry.brand_id = Some(brand.id);
        entry.actor = actor;
        self.activity.record(entry).await;

        tracing::info!(brand = %brand.code, domain = %record.domain, "Domain registered");
        Ok(record)
    }

    /// Soft-deactivate a domain. Returns `false` if it was not active.
    pub async fn deactivate_domain(&self, id: Uuid, actor: Option<Uuid>) -> Result<bool, AppError> {
        let Some(record) = self.catalog.deactivate_domain(id).await? else {
            return Ok(false);
        };

        let mut entry = ActivityEntry::new(ActivityAction::Delete).with_note(record.note.clone());
        entry.domain = record.domain.clone();
        entry.domain_host_key = record.host_key().to_string();
        entry.brand_id = Some(record.brand.id);
        entry.actor = actor;
        self.activity.record(entry).await;

        tracing::info!(brand = %record.brand.code, domain = %record.domain, "Domain deactivated");
        Ok(true)
    }
}
