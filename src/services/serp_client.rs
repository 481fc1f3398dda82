//! Search provider client.
//!
//! Talks to a Serper-compatible search API: one POST per query with the key
//! in the `X-API-KEY` header. The client itself knows nothing about key
//! rotation; it reports everything the provider sent back so the rotation
//! service can read quota hints from successes and failures alike.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::ProviderError;
use crate::models::serp_run::SearchParams;
use crate::services::key_rotation::ProviderResponse;

/// Outbound search, one call per query and key.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        params: &SearchParams,
        api_key: &str,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// One organic result as returned by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub redirect_link: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
}

impl OrganicResult {
    /// Destination link, falling back to the provider's redirect link.
    pub fn destination(&self) -> &str {
        self.link
            .as_deref()
            .filter(|link| !link.is_empty())
            .or(self.redirect_link.as_deref())
            .unwrap_or_default()
    }
}

/// First `limit` organic results of a response body.
///
/// Entries that do not look like results are skipped rather than failing
/// the whole check.
pub fn organic_results(body: &serde_json::Value, limit: usize) -> Vec<OrganicResult> {
    body.get("organic")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<OrganicResult>(item.clone()).ok())
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

/// HTTP client for the Serper search endpoint.
#[derive(Debug, Clone)]
pub struct SerperClient {
    client: reqwest::Client,
    endpoint: String,
}

impl SerperClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(
        &self,
        query: &str,
        params: &SearchParams,
        api_key: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let payload = json!({
            "q": query,
            "gl": params.gl,
            "hl": params.hl,
            "num": params.num,
            "device": params.device.as_str(),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::transport(format!("Failed to read response: {}", e)))?;
        let body: serde_json::Value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Provider returned {}", status));

            return Err(ProviderError {
                status: Some(status.as_u16()),
                message,
                headers,
                body,
            });
        }

        Ok(ProviderResponse { headers, body })
    }
}
