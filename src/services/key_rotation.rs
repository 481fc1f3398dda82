//! API key rotation service.
//!
//! A single provider key has a small fixed monthly quota, so searches are
//! spread over every active key. The service keeps one rotation cursor (an
//! index into the active key list) and, for each request:
//!
//! 1. Orders the active keys starting at the cursor, wrapping around
//! 2. Tries the request with each key until one succeeds
//! 3. Records the outcome on every key it tried
//! 4. Moves the cursor past the key that succeeded
//!
//! # Concurrency
//!
//! Cursor and usage counters are read-modify-write state. One async mutex
//! is held for a whole [`KeyRotationService::with_rotating_key`] call, so
//! concurrent checks never pick a key from a stale cursor.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, ProviderError};
use crate::models::api_key::{ApiKey, KeyQuota};
use crate::repositories::KeyStore;
use crate::services::quota::{KeyUsage, estimate_remaining, extract_remaining, month_start};

/// Raw provider response handed back by a request function.
#[derive(Debug, Clone, Default)]
pub struct ProviderResponse {
    /// Header names lower-cased
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

/// The key a request function should use.
#[derive(Debug, Clone)]
pub struct KeyHandle {
    pub id: Uuid,
    pub name: String,
    pub secret: String,
}

impl From<&ApiKey> for KeyHandle {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name.clone(),
            secret: key.secret.clone(),
        }
    }
}

/// Successful outcome of a rotated request.
#[derive(Debug, Clone)]
pub struct RotatedResponse {
    pub data: ProviderResponse,
    pub key_id: Uuid,
    pub key_name: String,
    /// Remaining quota reported by the provider for this key
    pub remaining: Option<i64>,
}

pub struct KeyRotationService {
    store: Arc<dyn KeyStore>,
    rotation: Mutex<()>,
}

impl KeyRotationService {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self {
            store,
            rotation: Mutex::new(()),
        }
    }

    /// Run `request` with the next active key, falling through to the
    /// following keys on failure.
    ///
    /// # Errors
    ///
    /// - `NoActiveKeys`: no key is active
    /// - `AllKeysFailed`: every active key failed; carries the last failure
    /// - `Database`: key state could not be loaded or saved
    pub async fn with_rotating_key<F, Fut>(&self, mut request: F) -> Result<RotatedResponse, AppError>
    where
        F: FnMut(KeyHandle) -> Fut + Send,
        Fut: Future<Output = Result<ProviderResponse, ProviderError>> + Send,
    {
        let _rotation = self.rotation.lock().await;

        let active: Vec<ApiKey> = self
            .store
            .list_keys()
            .await?
            .into_iter()
            .filter(|key| key.is_active)
            .collect();
        if active.is_empty() {
            return Err(AppError::NoActiveKeys);
        }

        let cursor = self.store.load_cursor().await?;
        let offset = cursor % active.len();
        let mut last_error: Option<ProviderError> = None;

        for step in 0..active.len() {
            let position = (offset + step) % active.len();
            let mut key = active[position].clone();

            match request(KeyHandle::from(&key)).await {
                Ok(response) => {
                    key.last_used_at = Some(Utc::now());
                    key.total_requests += 1;
                    key.last_error = None;
                    key.exhausted_at = None;
                    key.last_known_remaining = extract_remaining(&response.headers, &response.body);
                    self.store.record_attempt(&key, true).await?;
                    self.store.save_cursor((position + 1) % active.len()).await?;

                    tracing::debug!(key = %key.name, remaining = ?key.last_known_remaining, "Search request succeeded");

                    return Ok(RotatedResponse {
                        data: response,
                        key_id: key.id,
                        key_name: key.name,
                        remaining: key.last_known_remaining,
                    });
                }
                Err(error) => {
                    let now = Utc::now();
                    key.last_used_at = Some(now);
                    key.total_requests += 1;
                    key.last_error = Some(error.message.clone());
                    if let Some(remaining) = extract_remaining(&error.headers, &error.body) {
                        key.last_known_remaining = Some(remaining);
                    }
                    if error.is_quota_signal() {
                        key.exhausted_at = Some(now);
                    }
                    self.store.record_attempt(&key, false).await?;

                    tracing::warn!(
                        key = %key.name,
                        status = ?error.status,
                        "Search request failed, trying next key: {}",
                        error.message
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(AppError::AllKeysFailed(last_error.unwrap_or_else(|| {
            ProviderError::transport("All API keys failed")
        })))
    }

    /// Insert `keys` when no key is stored yet. Returns how many were added.
    pub async fn seed_keys(&self, keys: Vec<ApiKey>) -> Result<usize, AppError> {
        let _rotation = self.rotation.lock().await;

        if keys.is_empty() || !self.store.list_keys().await?.is_empty() {
            return Ok(0);
        }
        self.store.insert_keys(&keys).await?;
        Ok(keys.len())
    }

    /// Record an operator-supplied remaining quota for the key named
    /// `key_name` (or the first key). A baseline is captured only once.
    ///
    /// Returns the id of the key that received the baseline.
    pub async fn apply_baseline(
        &self,
        key_name: Option<&str>,
        remaining: i64,
    ) -> Result<Option<Uuid>, AppError> {
        if remaining < 0 {
            return Ok(None);
        }

        let _rotation = self.rotation.lock().await;
        let keys = self.store.list_keys().await?;

        let target = key_name
            .and_then(|name| keys.iter().find(|key| key.name == name))
            .or_else(|| keys.first());
        let Some(target) = target else {
            return Ok(None);
        };
        if target.baseline_captured_at.is_some() {
            return Ok(None);
        }

        self.store.set_baseline(target.id, remaining, Utc::now()).await?;
        tracing::info!(key = %target.name, remaining, "Quota baseline captured");

        Ok(Some(target.id))
    }

    /// Quota view of every key at `now`.
    pub async fn quota_summary(
        &self,
        monthly_limit: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<KeyQuota>, AppError> {
        let keys = self.store.list_keys().await?;
        let since_month = month_start(now);
        let mut summary = Vec::with_capacity(keys.len());

        for key in keys {
            let this_month = self.store.count_requests_since(key.id, since_month).await?;
            let since_baseline = match key.baseline_captured_at {
                Some(captured_at) => self.store.count_requests_since(key.id, captured_at).await?,
                None => 0,
            };
            let usage = KeyUsage {
                since_baseline,
                this_month,
            };

            summary.push(KeyQuota {
                id: key.id,
                name: key.name.clone(),
                masked_secret: key.masked_secret(),
                is_active: key.is_active,
                monthly_limit,
                requests_this_month: this_month,
                total_requests: key.total_requests,
                remaining_reported: key.last_known_remaining,
                remaining_display: estimate_remaining(&key, monthly_limit, usage),
                baseline_remaining: key.baseline_remaining,
                baseline_captured_at: key.baseline_captured_at,
                exhausted_at: key.exhausted_at,
                last_used_at: key.last_used_at,
                last_error: key.last_error,
            });
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryKeyStore;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    fn service(names: &[&str]) -> (Arc<MemoryKeyStore>, KeyRotationService) {
        let store = Arc::new(MemoryKeyStore::with_keys(names));
        let service = KeyRotationService::new(store.clone());
        (store, service)
    }

    fn ok_response(remaining: &str) -> ProviderResponse {
        ProviderResponse {
            headers: HashMap::from([("x-ratelimit-remaining".to_string(), remaining.to_string())]),
            body: json!({ "organic": [] }),
        }
    }

    #[tokio::test]
    async fn test_falls_through_to_working_key_and_advances_cursor() {
        let (store, service) = service(&["k1", "k2", "k3"]);
        let tried = Arc::new(StdMutex::new(Vec::new()));

        let log = tried.clone();
        let result = service
            .with_rotating_key(move |key| {
                log.lock().unwrap().push(key.name.clone());
                async move {
                    match key.name.as_str() {
                        "k3" => Ok(ok_response("42")),
                        "k1" => Err(ProviderError::http(429, "rate limited")),
                        _ => Err(ProviderError::http(500, "server error")),
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.key_name, "k3");
        assert_eq!(result.remaining, Some(42));
        assert_eq!(*tried.lock().unwrap(), vec!["k1", "k2", "k3"]);

        // Past k3 wraps around to the start of the ring
        assert_eq!(store.cursor(), 0);

        let k1 = store.key("k1");
        assert!(k1.exhausted_at.is_some());
        assert_eq!(k1.last_error.as_deref(), Some("rate limited"));
        let k2 = store.key("k2");
        assert!(k2.exhausted_at.is_none());
        assert_eq!(k2.total_requests, 1);
        let k3 = store.key("k3");
        assert_eq!(k3.last_known_remaining, Some(42));
        assert!(k3.last_error.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_calls_use_distinct_keys() {
        let (store, service) = service(&["k1", "k2", "k3"]);
        let tried = Arc::new(StdMutex::new(Vec::new()));

        let call = || {
            let log = tried.clone();
            service.with_rotating_key(move |key| {
                log.lock().unwrap().push(key.name.clone());
                async move {
                    // Give the other call a chance to interleave
                    tokio::task::yield_now().await;
                    Ok(ok_response("10"))
                }
            })
        };
        let (first, second) = tokio::join!(call(), call());

        let mut used = vec![first.unwrap().key_name, second.unwrap().key_name];
        used.sort();
        assert_eq!(used, vec!["k1", "k2"]);
        assert_eq!(*tried.lock().unwrap(), vec!["k1", "k2"]);
        assert_eq!(store.cursor(), 2);
    }

    #[tokio::test]
    async fn test_next_call_starts_after_last_successful_key() {
        let (store, service) = service(&["k1", "k2", "k3"]);
        let tried = Arc::new(StdMutex::new(Vec::new()));

        for _ in 0..3 {
            let log = tried.clone();
            service
                .with_rotating_key(move |key| {
                    log.lock().unwrap().push(key.name.clone());
                    async move { Ok::<_, ProviderError>(ok_response("1")) }
                })
                .await
                .unwrap();
        }

        assert_eq!(*tried.lock().unwrap(), vec!["k1", "k2", "k3"]);
        assert_eq!(store.cursor(), 0);

        // k1 fails, k2 succeeds: the following call must start at k3
        tried.lock().unwrap().clear();
        let log = tried.clone();
        service
            .with_rotating_key(move |key| {
                log.lock().unwrap().push(key.name.clone());
                async move {
                    if key.name == "k1" {
                        Err(ProviderError::http(503, "unavailable"))
                    } else {
                        Ok(ok_response("1"))
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(store.cursor(), 2);

        tried.lock().unwrap().clear();
        let log = tried.clone();
        service
            .with_rotating_key(move |key| {
                log.lock().unwrap().push(key.name.clone());
                async move { Ok::<_, ProviderError>(ok_response("1")) }
            })
            .await
            .unwrap();
        assert_eq!(*tried.lock().unwrap(), vec!["k3"]);
    }

    #[tokio::test]
    async fn test_all_keys_failing_returns_last_error() {
        let (store, service) = service(&["k1", "k2", "k3"]);

        let err = service
            .with_rotating_key(|key| async move {
                Err::<ProviderResponse, _>(ProviderError::http(402, format!("{} out of credits", key.name)))
            })
            .await
            .unwrap_err();

        match err {
            AppError::AllKeysFailed(last) => {
                assert_eq!(last.message, "k3 out of credits");
                assert_eq!(last.status, Some(402));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        for name in ["k1", "k2", "k3"] {
            let key = store.key(name);
            assert!(key.last_used_at.is_some(), "{name}");
            assert_eq!(key.last_error, Some(format!("{name} out of credits")));
            assert!(key.exhausted_at.is_some());
        }
        // Cursor does not move when nothing succeeded
        assert_eq!(store.cursor(), 0);
    }

    #[tokio::test]
    async fn test_no_active_keys() {
        let (store, service) = service(&["k1"]);
        store.keys.lock().unwrap()[0].is_active = false;

        let err = service
            .with_rotating_key(|_| async { Ok::<_, ProviderError>(ProviderResponse::default()) })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoActiveKeys));
    }

    #[tokio::test]
    async fn test_inactive_keys_are_skipped() {
        let (store, service) = service(&["k1", "k2"]);
        store.keys.lock().unwrap()[0].is_active = false;

        let result = service
            .with_rotating_key(|_| async { Ok::<_, ProviderError>(ProviderResponse::default()) })
            .await
            .unwrap();
        assert_eq!(result.key_name, "k2");
        assert_eq!(store.key("k1").total_requests, 0);
    }

    #[tokio::test]
    async fn test_seed_keys_only_into_empty_store() {
        let (store, service) = service(&[]);

        let added = service
            .seed_keys(vec![ApiKey::new("ENV Key 1", "aaa")])
            .await
            .unwrap();
        assert_eq!(added, 1);

        let added = service
            .seed_keys(vec![ApiKey::new("ENV Key 2", "bbb")])
            .await
            .unwrap();
        assert_eq!(added, 0);
        assert_eq!(store.keys.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_baseline_once_and_quota_summary() {
        let (store, service) = service(&["k1", "k2"]);

        let target = service.apply_baseline(Some("k2"), 100).await.unwrap();
        assert_eq!(target, Some(store.key("k2").id));
        // Second capture is ignored
        assert_eq!(service.apply_baseline(Some("k2"), 5).await.unwrap(), None);
        // Unknown names fall back to the first key
        assert_eq!(
            service.apply_baseline(Some("missing"), 50).await.unwrap(),
            Some(store.key("k1").id)
        );

        for _ in 0..3 {
            service
                .with_rotating_key(|_| async { Ok::<_, ProviderError>(ProviderResponse::default()) })
                .await
                .unwrap();
        }

        let summary = service.quota_summary(Some(2500), Utc::now()).await.unwrap();
        let k1 = summary.iter().find(|q| q.name == "k1").unwrap();
        let k2 = summary.iter().find(|q| q.name == "k2").unwrap();

        // k1 used twice, k2 once
        assert_eq!(k1.requests_this_month, 2);
        assert_eq!(k1.remaining_display, Some(48));
        assert_eq!(k2.requests_this_month, 1);
        assert_eq!(k2.remaining_display, Some(99));
        assert_eq!(k2.masked_secret, "sec***-k2");
    }
}
