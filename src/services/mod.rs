//! Business logic services.
//!
//! Services contain the core logic separated from HTTP handlers: key
//! rotation over the search provider, check orchestration, sweeps and
//! catalog maintenance. Persistence is reached only through the traits in
//! [`crate::repositories`].

pub mod check_cache;
pub mod domain_service;
pub mod key_rotation;
pub mod quota;
pub mod run_service;
pub mod serp_client;
pub mod sweep;

#[cfg(test)]
pub mod testing;
