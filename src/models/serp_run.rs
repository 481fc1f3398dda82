//! Check run models.
//!
//! This module defines:
//! - `Badge` and `MatchType`: per-result classification tags
//! - `ResultRow`: one classified search result
//! - `RunResult`: a complete check for one brand, with summary counts
//! - `SearchParams`: provider parameters a check was issued with

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::brand::BrandRef;
use crate::models::domain::MatchedDomain;

/// Ownership of a single search result relative to the requested brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Badge {
    Own,
    Competitor,
    Unknown,
}

impl Badge {
    /// Badge of a result given the brand of its matched domain, if any.
    ///
    /// - no match -> `Unknown`
    /// - matched brand is the requested brand -> `Own`
    /// - any other brand -> `Competitor`
    pub fn derive(matched_brand: Option<Uuid>, requested_brand: Uuid) -> Self {
        match matched_brand {
            None => Badge::Unknown,
            Some(id) if id == requested_brand => Badge::Own,
            Some(_) => Badge::Competitor,
        }
    }
}

/// Cascade step that produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Suffix,
    Contains,
    Token,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Desktop,
    Mobile,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Mobile => "mobile",
        }
    }
}

/// What caused a check.
///
/// Only `Auto` runs are persisted; manual runs are cached briefly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Manual,
    Auto,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Manual => "manual",
            Trigger::Auto => "auto",
        }
    }
}

/// Provider parameters of a check (`gl`, `hl`, `num`, `device`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    /// Country code, lower-case ISO 3166-1 alpha-2
    pub gl: String,

    /// Interface language
    pub hl: String,

    /// Number of results requested
    pub num: usize,

    pub device: Device,
}

/// One classified search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    /// 1-based position in the organic results
    pub rank: u32,
    pub title: String,
    pub snippet: String,
    pub link: String,
    pub domain_host: String,
    pub badge: Badge,
    pub match_type: MatchType,
    pub matched_domain: Option<MatchedDomain>,
    pub matched_brand: Option<BrandRef>,
}

/// Badge counts of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct RunSummary {
    pub own_count: u32,
    pub competitor_count: u32,
    pub unknown_count: u32,
    /// Lowest rank among `Own` rows
    pub best_own_rank: Option<u32>,
}

impl RunSummary {
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        rows.iter().fold(Self::default(), |mut summary, row| {
            match row.badge {
                Badge::Own => {
                    summary.own_count += 1;
                    summary.best_own_rank = Some(
                        summary
                            .best_own_rank
                            .map_or(row.rank, |best| best.min(row.rank)),
                    );
                }
                Badge::Competitor => summary.competitor_count += 1,
                Badge::Unknown => summary.unknown_count += 1,
            }
            summary
        })
    }
}

/// Complete result of checking one brand.
///
/// # JSON Example
///
/// ```json
/// {
///   "brand": { "id": "...", "code": "TOKO", "name": "Tokopedia", "color": "#10b981" },
///   "query": "TOKO",
///   "trigger": "manual",
///   "checked_at": "2025-12-21T16:00:00Z",
///   "params": { "gl": "id", "hl": "id", "num": 10, "device": "desktop" },
///   "key_id": "...",
///   "key_name": "ENV Key 1",
///   "key_remaining": 2431,
///   "summary": { "own_count": 2, "competitor_count": 3, "unknown_count": 5, "best_own_rank": 1 },
///   "results": [],
///   "cached": false
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub brand: BrandRef,
    pub query: String,
    pub trigger: Trigger,
    pub checked_at: DateTime<Utc>,
    pub params: SearchParams,
    pub key_id: Uuid,
    pub key_name: String,
    pub key_remaining: Option<i64>,
    pub summary: RunSummary,
    pub results: Vec<ResultRow>,
    pub cached: bool,
}
