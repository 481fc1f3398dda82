//! Brand model.
//!
//! A brand owns zero or more registered domains. Its `code` doubles as the
//! default search query for a check.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a brand record from the database.
///
/// # Database Table
///
/// Maps to the `brands` table. Brands are soft-deactivated via `is_active`;
/// inactive brands are skipped by sweeps and rejected by manual checks.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Brand {
    pub id: Uuid,

    /// Short unique code, e.g. `TOKO`
    pub code: String,

    pub name: String,

    /// Display color used by the dashboard badge (e.g. `#10b981`)
    pub color: String,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

impl Brand {
    /// Query used when a check does not supply one: code, then name.
    pub fn default_query(&self) -> &str {
        let code = self.code.trim();
        if code.is_empty() { self.name.trim() } else { code }
    }
}

/// Brand fields copied onto matched domains and result rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct BrandRef {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub color: String,
}

impl From<&Brand> for BrandRef {
    fn from(brand: &Brand) -> Self {
        Self {
            id: brand.id,
            code: brand.code.clone(),
            name: brand.name.clone(),
            color: brand.color.clone(),
        }
    }
}
