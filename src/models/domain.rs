//! Registered domain model.
//!
//! A domain record keeps the raw string an operator registered plus the
//! lookup keys derived from it. The derived keys are private and only ever
//! computed by [`build_domain_keys`], so they cannot drift from their source.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::matching::normalize::{DomainKeys, build_domain_keys};
use crate::models::brand::BrandRef;

/// A registered domain together with its owning brand.
#[derive(Debug, Clone, Serialize)]
pub struct DomainRecord {
    pub id: Uuid,

    /// Raw string as registered (`https://www.example.com/shop`, `example.com`, ...)
    pub domain: String,

    pub brand: BrandRef,

    pub note: String,

    pub is_active: bool,

    host_key: String,
    root_key: String,
    path_prefix: String,
    tokens: Vec<String>,
}

impl DomainRecord {
    /// Build a record, deriving every lookup key from `domain` and the brand code.
    pub fn derive(id: Uuid, domain: impl Into<String>, brand: BrandRef, is_active: bool) -> Self {
        let domain = domain.into().trim().to_string();
        let DomainKeys {
            host_key,
            root_key,
            path_prefix,
            tokens,
        } = build_domain_keys(&domain, &brand.code);

        Self {
            id,
            domain,
            brand,
            note: String::new(),
            is_active,
            host_key,
            root_key,
            path_prefix,
            tokens,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Replace the raw string and recompute the derived keys.
    pub fn set_domain(&mut self, domain: impl Into<String>) {
        let rebuilt = Self::derive(self.id, domain, self.brand.clone(), self.is_active);
        *self = rebuilt.with_note(std::mem::take(&mut self.note));
    }

    pub fn host_key(&self) -> &str {
        &self.host_key
    }

    pub fn root_key(&self) -> &str {
        &self.root_key
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether the record can take part in classification.
    pub fn is_classifiable(&self) -> bool {
        self.is_active && !self.host_key.is_empty()
    }
}

/// Row shape of `domains` joined with `brands`.
///
/// Only the raw columns are read; lookup keys are rebuilt by
/// [`DomainRecord::derive`] when the row is converted.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DomainRow {
    pub id: Uuid,
    pub domain: String,
    pub note: String,
    pub is_active: bool,
    pub brand_id: Uuid,
    pub brand_code: String,
    pub brand_name: String,
    pub brand_color: String,
    pub created_at: DateTime<Utc>,
}

impl From<DomainRow> for DomainRecord {
    fn from(row: DomainRow) -> Self {
        let brand = BrandRef {
            id: row.brand_id,
            code: row.brand_code,
            name: row.brand_name,
            color: row.brand_color,
        };
        DomainRecord::derive(row.id, row.domain, brand, row.is_active).with_note(row.note)
    }
}

/// Subset of a matched domain copied onto a search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct MatchedDomain {
    pub id: Uuid,
    pub domain: String,
    pub host_key: String,
    pub root_key: String,
    pub path_prefix: String,
}

impl From<&DomainRecord> for MatchedDomain {
    fn from(record: &DomainRecord) -> Self {
        Self {
            id: record.id,
            domain: record.domain.clone(),
            host_key: record.host_key.clone(),
            root_key: record.root_key.clone(),
            path_prefix: record.path_prefix.clone(),
        }
    }
}
