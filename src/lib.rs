//! SERP rank tracker.
//!
//! Checks where a brand's registered domains rank in web search results.
//! A check issues one search through a pool of rotating provider API keys,
//! then classifies every organic result as the brand's own domain, a
//! competitor's, or unknown.
//!
//! # Layout
//!
//! - [`matching`]: host normalization, catalog index and classification cascade
//! - [`services`]: key rotation, checks, sweeps and domain registration
//! - [`repositories`]: persistence traits and their PostgreSQL implementations
//! - [`handlers`]: the HTTP surface

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod matching;
pub mod models;
pub mod repositories;
pub mod services;
