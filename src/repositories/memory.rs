//! In-memory repository doubles for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::activity::ActivityEntry;
use crate::models::api_key::ApiKey;
use crate::models::brand::{Brand, BrandRef};
use crate::models::domain::DomainRecord;
use crate::models::serp_run::RunResult;
use crate::repositories::{ActivitySink, CatalogRepository, KeyStore, RunRepository};

#[derive(Default)]
pub struct MemoryCatalog {
    pub brands: Mutex<Vec<Brand>>,
    pub domains: Mutex<Vec<DomainRecord>>,
}

impl MemoryCatalog {
    pub fn add_brand(&self, code: &str) -> Brand {
        let brand = Brand {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: format!("{code} Brand"),
            color: "#64748b".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.brands.lock().unwrap().push(brand.clone());
        brand
    }

    pub fn add_domain(&self, brand: &Brand, raw: &str) -> DomainRecord {
        let record = DomainRecord::derive(Uuid::new_v4(), raw, BrandRef::from(brand), true);
        self.domains.lock().unwrap().push(record.clone());
        record
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn find_active_brands(&self) -> Result<Vec<Brand>, AppError> {
        let mut brands: Vec<Brand> = self
            .brands
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.is_active)
            .cloned()
            .collect();
        brands.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(brands)
    }

    async fn find_brand(&self, id: Uuid) -> Result<Option<Brand>, AppError> {
        Ok(self.brands.lock().unwrap().iter().find(|b| b.id == id).cloned())
    }

    async fn find_active_domains(&self) -> Result<Vec<DomainRecord>, AppError> {
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.is_active)
            .cloned()
            .collect())
    }

    async fn find_active_domain(
        &self,
        brand_id: Uuid,
        host_key: &str,
        path_prefix: &str,
    ) -> Result<Option<DomainRecord>, AppError> {
        Ok(self
            .domains
            .lock()
            .unwrap()
            .iter()
            .find(|d| {
                d.is_active
                    && d.brand.id == brand_id
                    && d.host_key() == host_key
                    && d.path_prefix() == path_prefix
            })
            .cloned())
    }

    async fn insert_domain(&self, domain: &DomainRecord) -> Result<(), AppError> {
        self.domains.lock().unwrap().push(domain.clone());
        Ok(())
    }

    async fn deactivate_domain(&self, id: Uuid) -> Result<Option<DomainRecord>, AppError> {
        let mut domains = self.domains.lock().unwrap();
        match domains.iter_mut().find(|d| d.id == id && d.is_active) {
            Some(domain) => {
                domain.is_active = false;
                Ok(Some(domain.clone()))
            }
            None => Ok(None),
        }
    }
}

#[derive(Default)]
pub struct MemoryKeyStore {
    pub keys: Mutex<Vec<ApiKey>>,
    pub cursor: Mutex<usize>,
    pub attempts: Mutex<Vec<(Uuid, DateTime<Utc>, bool)>>,
}

impl MemoryKeyStore {
    pub fn with_keys(names: &[&str]) -> Self {
        let store = Self::default();
        *store.keys.lock().unwrap() = names
            .iter()
            .map(|name| ApiKey::new(*name, format!("secret-{name}")))
            .collect();
        store
    }

    pub fn key(&self, name: &str) -> ApiKey {
        self.keys
            .lock()
            .unwrap()
            .iter()
            .find(|k| k.name == name)
            .cloned()
            .expect("key exists")
    }

    pub fn cursor(&self) -> usize {
        *self.cursor.lock().unwrap()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn list_keys(&self) -> Result<Vec<ApiKey>, AppError> {
        Ok(self.keys.lock().unwrap().clone())
    }

    async fn insert_keys(&self, keys: &[ApiKey]) -> Result<(), AppError> {
        self.keys.lock().unwrap().extend(keys.iter().cloned());
        Ok(())
    }

    async fn load_cursor(&self) -> Result<usize, AppError> {
        Ok(self.cursor())
    }

    async fn save_cursor(&self, cursor: usize) -> Result<(), AppError> {
        *self.cursor.lock().unwrap() = cursor;
        Ok(())
    }

    async fn record_attempt(&self, key: &ApiKey, succeeded: bool) -> Result<(), AppError> {
        let mut keys = self.keys.lock().unwrap();
        if let Some(stored) = keys.iter_mut().find(|k| k.id == key.id) {
            *stored = key.clone();
        }
        self.attempts.lock().unwrap().push((
            key.id,
            key.last_used_at.unwrap_or_else(Utc::now),
            succeeded,
        ));
        Ok(())
    }

    async fn count_requests_since(&self, key_id: Uuid, since: DateTime<Utc>) -> Result<i64, AppError> {
        Ok(self
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, at, _)| *id == key_id && *at >= since)
            .count() as i64)
    }

    async fn set_baseline(
        &self,
        key_id: Uuid,
        remaining: i64,
        captured_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(key) = self.keys.lock().unwrap().iter_mut().find(|k| k.id == key_id) {
            key.baseline_remaining = Some(remaining);
            key.baseline_captured_at = Some(captured_at);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRuns {
    pub runs: Mutex<Vec<RunResult>>,
}

#[async_trait]
impl RunRepository for MemoryRuns {
    async fn save_run(&self, run: &RunResult) -> Result<(), AppError> {
        self.runs.lock().unwrap().push(run.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryActivity {
    pub entries: Mutex<Vec<ActivityEntry>>,
}

impl MemoryActivity {
    pub fn actions(&self) -> Vec<&'static str> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.action.as_str())
            .collect()
    }
}

#[async_trait]
impl ActivitySink for MemoryActivity {
    async fn record(&self, entry: ActivityEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}
