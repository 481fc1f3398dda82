//! Check orchestration.
//!
//! A check resolves the brand, issues one search through the key rotation
//! service, rebuilds the catalog index from the current active domains,
//! and classifies each of the top results. A sweep runs a check for every
//! active brand, one at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::matching::catalog::{CatalogIndex, build_index};
use crate::matching::classify::{MatchOptions, classify_with};
use crate::matching::normalize::normalize_host;
use crate::models::brand::BrandRef;
use crate::models::domain::MatchedDomain;
use crate::models::serp_run::{
    Badge, Device, ResultRow, RunResult, RunSummary, SearchParams, Trigger,
};
use crate::repositories::{CatalogRepository, RunRepository};
use crate::services::check_cache::{CacheKey, CheckCache};
use crate::services::key_rotation::KeyRotationService;
use crate::services::serp_client::{OrganicResult, SearchProvider, organic_results};

/// Tunables of a check.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub default_country: String,
    pub language: String,
    /// How many organic results are classified
    pub result_limit: usize,
    pub cache_ttl: Duration,
    pub match_options: MatchOptions,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            default_country: "id".to_string(),
            language: "id".to_string(),
            result_limit: 10,
            cache_ttl: Duration::from_secs(120),
            match_options: MatchOptions::default(),
        }
    }
}

/// Parameters of a single-brand check.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRequest {
    pub brand_id: Uuid,
    /// Defaults to the brand code, then the brand name
    #[serde(default)]
    pub query: Option<String>,
    /// Two-letter country code; defaults to the configured country
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub device: Device,
    #[serde(skip)]
    pub trigger: Trigger,
    /// Bypass the short-lived result cache
    #[serde(skip)]
    pub skip_cache: bool,
}

/// Progress reported after each brand of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepProgress {
    pub processed_brands: usize,
    pub total_brands: usize,
    pub current_brand_code: Option<String>,
}

/// Result of checking one brand during a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct BrandOutcome {
    pub brand_id: Uuid,
    pub brand_code: String,
    pub ok: bool,
    pub checked_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub outcomes: Vec<BrandOutcome>,
    /// Cancellation fired before every brand was checked
    pub stopped: bool,
}

impl SweepResult {
    pub fn ok_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.ok).count()
    }

    pub fn fail_count(&self) -> usize {
        self.outcomes.len() - self.ok_count()
    }
}

pub struct RunService {
    catalog: Arc<dyn CatalogRepository>,
    runs: Arc<dyn RunRepository>,
    keys: Arc<KeyRotationService>,
    provider: Arc<dyn SearchProvider>,
    cache: CheckCache,
    settings: RunSettings,
}

impl RunService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        runs: Arc<dyn RunRepository>,
        keys: Arc<KeyRotationService>,
        provider: Arc<dyn SearchProvider>,
        settings: RunSettings,
    ) -> Self {
        Self {
            catalog,
            runs,
            keys,
            provider,
            cache: CheckCache::new(settings.cache_ttl),
            settings,
        }
    }

    /// Check where a brand's domains rank for one query.
    ///
    /// # Process
    ///
    /// 1. Resolve the active brand and default the query to its code
    /// 2. Serve a cached result for the same brand/query/country/device
    ///    unless `skip_cache` is set
    /// 3. Search through the key rotation service
    /// 4. Build the catalog index from the current active domains
    /// 5. Classify the top results and count badges
    /// 6. Persist auto-triggered runs, cache manual ones
    ///
    /// # Errors
    ///
    /// - `BrandNotFound`: unknown or inactive brand
    /// - `InvalidRequest`: country is not a two-letter code, empty query
    /// - `NoActiveKeys` / `AllKeysFailed`: the search could not be issued
    pub async fn run_check_for_brand(&self, request: CheckRequest) -> Result<RunResult, AppError> {
        let brand = self
            .catalog
            .find_brand(request.brand_id)
            .await?
            .filter(|brand| brand.is_active)
            .ok_or(AppError::BrandNotFound)?;

        let query = request
            .query
            .as_deref()
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .unwrap_or_else(|| brand.default_query())
            .to_string();
        if query.is_empty() {
            return Err(AppError::InvalidRequest("Query must not be empty".to_string()));
        }

        let country = normalize_country(
            request
                .country
                .as_deref()
                .unwrap_or(self.settings.default_country.as_str()),
        )?;
        let params = SearchParams {
            gl: country,
            hl: self.settings.language.clone(),
            num: self.settings.result_limit,
            device: request.device,
        };

        let cache_key = CacheKey {
            brand_id: brand.id,
            query: query.clone(),
            country: params.gl.clone(),
            language: params.hl.clone(),
            device: params.device,
        };
        if !request.skip_cache {
            if let Some(mut cached) = self.cache.get(&cache_key) {
                cached.cached = true;
                return Ok(cached);
            }
        }

        let provider = self.provider.clone();
        let rotated = self
            .keys
            .with_rotating_key(|key| {
                let provider = provider.clone();
                let query = query.clone();
                let params = params.clone();
                async move { provider.search(&query, &params, &key.secret).await }
            })
            .await?;

        let organic = organic_results(&rotated.data.body, self.settings.result_limit);
        let index = build_index(self.catalog.find_active_domains().await?);
        let results = classify_results(&organic, &index, brand.id, &self.settings.match_options);
        let summary = RunSummary::from_rows(&results);

        let run = RunResult {
            brand: BrandRef::from(&brand),
            query,
            trigger: request.trigger,
            checked_at: Utc::now(),
            params,
            key_id: rotated.key_id,
            key_name: rotated.key_name,
            key_remaining: rotated.remaining,
            summary,
            results,
            cached: false,
        };

        if run.trigger == Trigger::Auto {
            self.runs.save_run(&run).await?;
        }

        tracing::info!(
            brand = %brand.code,
            query = %run.query,
            own = summary.own_count,
            competitor = summary.competitor_count,
            best_own_rank = ?summary.best_own_rank,
            "Check complete"
        );

        if run.trigger == Trigger::Manual {
            self.cache.insert(cache_key, run.clone());
        }
        Ok(run)
    }

    /// Check every active brand in code order, one after another.
    ///
    /// `should_stop` is polled before each brand; once it returns `true`
    /// the sweep ends with `stopped = true`. A brand that fails is recorded
    /// in its outcome and the sweep moves on.
    ///
    /// # Errors
    ///
    /// Only when the brand list itself cannot be loaded.
    pub async fn run_auto_check_for_all_brands<S, P>(
        &self,
        should_stop: S,
        mut on_progress: P,
    ) -> Result<SweepResult, AppError>
    where
        S: Fn() -> bool + Send + Sync,
        P: FnMut(SweepProgress) + Send,
    {
        let brands = self.catalog.find_active_brands().await?;
        let total_brands = brands.len();
        let mut outcomes = Vec::with_capacity(total_brands);
        let mut stopped = false;

        for brand in brands {
            if should_stop() {
                stopped = true;
                break;
            }

            let request = CheckRequest {
                brand_id: brand.id,
                query: Some(brand.default_query().to_string()),
                trigger: Trigger::Auto,
                skip_cache: true,
                ..CheckRequest::default()
            };

            let outcome = match self.run_check_for_brand(request).await {
                Ok(run) => BrandOutcome {
                    brand_id: brand.id,
                    brand_code: brand.code.clone(),
                    ok: true,
                    checked_at: Some(run.checked_at),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(brand = %brand.code, "Auto check failed: {}", e);
                    BrandOutcome {
                        brand_id: brand.id,
                        brand_code: brand.code.clone(),
                        ok: false,
                        checked_at: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);

            on_progress(SweepProgress {
                processed_brands: outcomes.len(),
                total_brands,
                current_brand_code: Some(brand.code),
            });
        }

        Ok(SweepResult { outcomes, stopped })
    }
}

/// Lower-cased two-letter country code.
pub fn normalize_country(country: &str) -> Result<String, AppError> {
    let country = country.trim().to_lowercase();
    if country.len() == 2 && country.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(country)
    } else {
        Err(AppError::InvalidRequest(format!(
            "Invalid country code: {}",
            country
        )))
    }
}

/// Classify organic results against `index` relative to `requested_brand`.
pub fn classify_results(
    organic: &[OrganicResult],
    index: &CatalogIndex,
    requested_brand: Uuid,
    options: &MatchOptions,
) -> Vec<ResultRow> {
    organic
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let link = item.destination().to_string();
            let domain_host = normalize_host(&link);
            let matched = classify_with(&domain_host, &link, index, options);

            let matched_brand = matched.matched.map(|domain| domain.brand.clone());
            let badge = Badge::derive(matched_brand.as_ref().map(|brand| brand.id), requested_brand);

            ResultRow {
                rank: position as u32 + 1,
                title: item
                    .title
                    .clone()
                    .filter(|title| !title.is_empty())
                    .unwrap_or_else(|| "(No title)".to_string()),
                snippet: item.snippet.clone().unwrap_or_default(),
                link,
                domain_host,
                badge,
                match_type: matched.match_type,
                matched_domain: matched.matched.map(MatchedDomain::from),
                matched_brand,
            }
        })
        .collect()
}
