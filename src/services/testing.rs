//! Test doubles shared by the service tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::error::ProviderError;
use crate::models::serp_run::SearchParams;
use crate::repositories::memory::{MemoryCatalog, MemoryKeyStore, MemoryRuns};
use crate::services::key_rotation::{KeyRotationService, ProviderResponse};
use crate::services::run_service::{RunService, RunSettings};
use crate::services::serp_client::SearchProvider;

/// Returns the same organic links for every query except the failing ones.
pub struct FakeProvider {
    links: Vec<String>,
    failing_queries: HashSet<String>,
    pub calls: AtomicUsize,
    pub last_params: Mutex<Option<SearchParams>>,
}

impl FakeProvider {
    pub fn new(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            failing_queries: HashSet::new(),
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }

    pub fn failing_for(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }
}

#[async_trait]
impl SearchProvider for FakeProvider {
    async fn search(
        &self,
        query: &str,
        params: &SearchParams,
        _api_key: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params.clone());

        if self.failing_queries.contains(query) {
            return Err(ProviderError::http(500, format!("provider down for {query}")));
        }

        let organic: Vec<_> = self
            .links
            .iter()
            .map(|link| json!({ "title": format!("Result {link}"), "link": link, "snippet": "..." }))
            .collect();
        Ok(ProviderResponse {
            headers: Default::default(),
            body: json!({ "organic": organic }),
        })
    }
}

pub struct Fixture {
    pub catalog: Arc<MemoryCatalog>,
    pub runs: Arc<MemoryRuns>,
    pub keys: Arc<MemoryKeyStore>,
    pub rotation: Arc<KeyRotationService>,
    pub provider: Arc<FakeProvider>,
    pub service: Arc<RunService>,
}

pub fn fixture(provider: FakeProvider) -> Fixture {
    let catalog = Arc::new(MemoryCatalog::default());
    let runs = Arc::new(MemoryRuns::default());
    let keys = Arc::new(MemoryKeyStore::with_keys(&["k1", "k2"]));
    let provider = Arc::new(provider);
    let rotation = Arc::new(KeyRotationService::new(keys.clone()));
    let service = Arc::new(RunService::new(
        catalog.clone(),
        runs.clone(),
        rotation.clone(),
        provider.clone(),
        RunSettings::default(),
    ));

    Fixture {
        catalog,
        runs,
        keys,
        rotation,
        provider,
        service,
    }
}
