//! In-memory lookup structures over the active domain catalog.
//!
//! An index is built once per check from the current active domains and
//! never mutated afterwards. Classification only borrows it, so any number
//! of callers may share one.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

use crate::models::domain::DomainRecord;

/// Immutable lookup index over classifiable domains.
///
/// Domains are addressed by their position in `domains`.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    domains: Vec<DomainRecord>,
    by_host: HashMap<String, Vec<usize>>,
    by_root: HashMap<String, Vec<usize>>,
    by_token: HashMap<String, BTreeSet<usize>>,
    /// Most specific first, see [`specificity`]
    by_specificity: Vec<usize>,
}

/// Ordering that puts the more specific domain first.
///
/// Longer host key wins, then longer path prefix. Remaining ties are broken
/// on host key, path prefix and id so the order is total.
pub fn specificity(a: &DomainRecord, b: &DomainRecord) -> Ordering {
    b.host_key()
        .len()
        .cmp(&a.host_key().len())
        .then_with(|| b.path_prefix().len().cmp(&a.path_prefix().len()))
        .then_with(|| a.host_key().cmp(b.host_key()))
        .then_with(|| a.path_prefix().cmp(b.path_prefix()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Build an index from a domain list.
///
/// Inactive domains, domains whose raw string did not normalize to a host,
/// and repeated ids are left out.
pub fn build_index(domains: impl IntoIterator<Item = DomainRecord>) -> CatalogIndex {
    let mut index = CatalogIndex::default();
    let mut seen: HashSet<Uuid> = HashSet::new();

    for domain in domains {
        if !domain.is_classifiable() || !seen.insert(domain.id) {
            continue;
        }

        let position = index.domains.len();
        index
            .by_host
            .entry(domain.host_key().to_string())
            .or_default()
            .push(position);
        index
            .by_root
            .entry(domain.root_key().to_string())
            .or_default()
            .push(position);
        for token in domain.tokens() {
            index
                .by_token
                .entry(token.clone())
                .or_default()
                .insert(position);
        }

        index.domains.push(domain);
    }

    let mut order: Vec<usize> = (0..index.domains.len()).collect();
    order.sort_by(|&a, &b| specificity(&index.domains[a], &index.domains[b]));
    index.by_specificity = order;

    tracing::debug!(
        domains = index.domains.len(),
        hosts = index.by_host.len(),
        tokens = index.by_token.len(),
        "Catalog index built"
    );

    index
}

impl CatalogIndex {
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domain(&self, position: usize) -> &DomainRecord {
        &self.domains[position]
    }

    /// Domains registered under exactly this host key.
    pub fn by_host(&self, host_key: &str) -> &[usize] {
        self.by_host.get(host_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Domains sharing this registrable domain.
    pub fn by_root(&self, root_key: &str) -> &[usize] {
        self.by_root.get(root_key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Domains carrying this token.
    pub fn by_token(&self, token: &str) -> impl Iterator<Item = usize> + '_ {
        self.by_token.get(token).into_iter().flatten().copied()
    }

    /// Every domain, most specific first.
    pub fn most_specific_first(&self) -> impl Iterator<Item = (usize, &DomainRecord)> + '_ {
        self.by_specificity
            .iter()
            .map(move |&position| (position, &self.domains[position]))
    }
}
