//! Domain classification engine.
//!
//! Pure, synchronous code: normalization of hosts and links, the per-check
//! catalog index, and the matching cascade that maps a search result onto a
//! registered domain.

pub mod catalog;
pub mod classify;
pub mod normalize;

pub use catalog::{CatalogIndex, build_index};
pub use classify::{MatchOptions, MatchResult, classify, classify_with};
