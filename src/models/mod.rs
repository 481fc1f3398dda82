//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the value types a check produces.

/// Activity log entries
pub mod activity;
/// Search-provider API keys
pub mod api_key;
/// Brands
pub mod brand;
/// Registered domains
pub mod domain;
/// Check runs and classified results
pub mod serp_run;
