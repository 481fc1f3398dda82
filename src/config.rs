//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

use crate::matching::MatchOptions;
use crate::services::run_service::RunSettings;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `SERPER_API_URL` (optional): search endpoint
/// - `SERPER_API_KEYS` (optional): comma-separated keys seeded into an empty key table
/// - `SERPER_TIMEOUT_SECS` (optional): per-request timeout, defaults to 20
/// - `SERPER_MONTHLY_LIMIT` (optional): per-key monthly quota used for estimates
/// - `SERPER_BASELINE_REMAINING` / `SERPER_BASELINE_KEY_NAME` (optional):
///   operator-observed remaining quota, captured once
/// - `DEFAULT_COUNTRY`, `SEARCH_LANGUAGE` (optional): both default to `id`
/// - `RESULT_LIMIT` (optional): results classified per check, defaults to 10
/// - `CHECK_CACHE_TTL_SECS` (optional): manual check cache, defaults to 120
/// - `CONTAINS_MATCH_ENABLED` (optional): substring fallback, defaults to true
/// - `AUTO_CHECK_ON_STARTUP` (optional): start a sweep at boot, defaults to false
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_serper_api_url")]
    pub serper_api_url: String,

    #[serde(default)]
    pub serper_api_keys: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub serper_timeout_secs: u64,

    #[serde(default)]
    pub serper_monthly_limit: Option<i64>,

    #[serde(default)]
    pub serper_baseline_remaining: Option<i64>,

    #[serde(default)]
    pub serper_baseline_key_name: Option<String>,

    #[serde(default = "default_locale")]
    pub default_country: String,

    #[serde(default = "default_locale")]
    pub search_language: String,

    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    #[serde(default = "default_cache_ttl_secs")]
    pub check_cache_ttl_secs: u64,

    #[serde(default = "default_true")]
    pub contains_match_enabled: bool,

    #[serde(default)]
    pub auto_check_on_startup: bool,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_serper_api_url() -> String {
    "https://google.serper.dev/search".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_locale() -> String {
    "id".to_string()
}

fn default_result_limit() -> usize {
    10
}

fn default_cache_ttl_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    pub fn serper_timeout(&self) -> Duration {
        Duration::from_secs(self.serper_timeout_secs)
    }

    /// Check settings derived from this configuration.
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            default_country: self.default_country.trim().to_lowercase(),
            language: self.search_language.trim().to_lowercase(),
            result_limit: self.result_limit.max(1),
            cache_ttl: Duration::from_secs(self.check_cache_ttl_secs),
            match_options: MatchOptions {
                contains_match: self.contains_match_enabled,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_env() {
        let vars = vec![("DATABASE_URL".to_string(), "postgres://localhost/serp".to_string())];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.serper_api_url, "https://google.serper.dev/search");
        assert_eq!(config.serper_timeout(), Duration::from_secs(20));
        assert!(config.serper_api_keys.is_none());
        assert!(config.serper_monthly_limit.is_none());
        assert!(!config.auto_check_on_startup);

        let settings = config.run_settings();
        assert_eq!(settings.default_country, "id");
        assert_eq!(settings.language, "id");
        assert_eq!(settings.result_limit, 10);
        assert_eq!(settings.cache_ttl, Duration::from_secs(120));
        assert!(settings.match_options.contains_match);
    }

    #[test]
    fn test_overrides() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "postgres://localhost/serp".to_string()),
            ("SERPER_API_KEYS".to_string(), "a,b".to_string()),
            ("SERPER_MONTHLY_LIMIT".to_string(), "2500".to_string()),
            ("DEFAULT_COUNTRY".to_string(), "SG".to_string()),
            ("CONTAINS_MATCH_ENABLED".to_string(), "false".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.serper_api_keys.as_deref(), Some("a,b"));
        assert_eq!(config.serper_monthly_limit, Some(2500));
        let settings = config.run_settings();
        assert_eq!(settings.default_country, "sg");
        assert!(!settings.match_options.contains_match);
    }

    #[test]
    fn test_missing_database_url_fails() {
        let vars: Vec<(String, String)> = Vec::new();
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }
}
