//! Search-provider API key model.
//!
//! Outbound searches are spread across several provider keys. Each key keeps
//! its own usage and failure state, which is updated after every attempt and
//! persisted so it survives restarts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a provider API key record from the database.
///
/// # Database Table
///
/// Maps to the `serp_api_keys` table. Keys are never deleted automatically;
/// an operator deactivates them by clearing `is_active`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    /// Human-readable label, e.g. `ENV Key 1`
    pub name: String,

    /// Secret sent to the provider. Never serialized.
    pub secret: String,

    pub is_active: bool,

    pub last_used_at: Option<DateTime<Utc>>,

    /// Message of the most recent failed attempt, cleared on success
    pub last_error: Option<String>,

    /// Set when the provider answered with a quota or auth status
    /// (401, 402, 403, 429), cleared on success
    pub exhausted_at: Option<DateTime<Utc>>,

    /// Remaining quota as last reported by the provider, if it reported one
    pub last_known_remaining: Option<i64>,

    /// Attempts made with this key, successful or not
    pub total_requests: i64,

    /// Operator-supplied ground truth for remaining quota
    pub baseline_remaining: Option<i64>,

    /// When `baseline_remaining` was captured
    pub baseline_captured_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Fresh active key with no recorded usage.
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            secret: secret.into(),
            is_active: true,
            last_used_at: None,
            last_error: None,
            exhausted_at: None,
            last_known_remaining: None,
            total_requests: 0,
            baseline_remaining: None,
            baseline_captured_at: None,
            created_at: Utc::now(),
        }
    }

    /// Secret with everything but the first and last three characters hidden.
    pub fn masked_secret(&self) -> String {
        let chars: Vec<char> = self.secret.chars().collect();
        if chars.len() > 6 {
            let head: String = chars[..3].iter().collect();
            let tail: String = chars[chars.len() - 3..].iter().collect();
            format!("{head}***{tail}")
        } else {
            "***".to_string()
        }
    }
}

/// Seed keys from a comma-separated list, named `ENV Key 1`, `ENV Key 2`, ...
pub fn parse_env_keys(raw: &str) -> Vec<ApiKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .enumerate()
        .map(|(index, secret)| ApiKey::new(format!("ENV Key {}", index + 1), secret))
        .collect()
}

/// Quota view of one key, as shown to operators.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "ENV Key 1",
///   "masked_secret": "abc***xyz",
///   "is_active": true,
///   "monthly_limit": 2500,
///   "requests_this_month": 42,
///   "total_requests": 310,
///   "remaining_reported": null,
///   "remaining_display": 2458
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct KeyQuota {
    pub id: Uuid,
    pub name: String,
    pub masked_secret: String,
    pub is_active: bool,
    pub monthly_limit: Option<i64>,
    pub requests_this_month: i64,
    pub total_requests: i64,
    pub remaining_reported: Option<i64>,
    pub remaining_display: Option<i64>,
    pub baseline_remaining: Option<i64>,
    pub baseline_captured_at: Option<DateTime<Utc>>,
    pub exhausted_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_secret() {
        assert_eq!(ApiKey::new("k", "abcdef123456xyz").masked_secret(), "abc***xyz");
        assert_eq!(ApiKey::new("k", "short").masked_secret(), "***");
    }

    #[test]
    fn test_parse_env_keys() {
        let keys = parse_env_keys(" first , ,second,");
        let names: Vec<_> = keys.iter().map(|k| k.name.as_str()).collect();
        let secrets: Vec<_> = keys.iter().map(|k| k.secret.as_str()).collect();

        assert_eq!(names, vec!["ENV Key 1", "ENV Key 2"]);
        assert_eq!(secrets, vec!["first", "second"]);
        assert!(keys.iter().all(|k| k.is_active && k.total_requests == 0));
    }
}
