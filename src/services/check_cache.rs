//! Short-lived cache of check results.
//!
//! Absorbs duplicate requests fired in quick succession for the same brand,
//! query, country and device. Entries expire after a fixed TTL and are
//! dropped lazily on read.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::models::serp_run::{Device, RunResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub brand_id: Uuid,
    pub query: String,
    pub country: String,
    pub language: String,
    pub device: Device,
}

pub struct CheckCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, RunResult)>>,
}

impl CheckCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached result for `key`, if it has not expired.
    pub fn get(&self, key: &CacheKey) -> Option<RunResult> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let expired = match entries.get(key) {
            Some((expires_at, result)) if Instant::now() <= *expires_at => {
                return Some(result.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: CacheKey, result: RunResult) {
        let expires_at = Instant::now() + self.ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, (expiry, _)| Instant::now() <= *expiry);
        entries.insert(key, (expires_at, result));
    }
}
