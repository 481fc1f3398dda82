//! Search-result classification.
//!
//! Given the host and raw link of a search result, find the registered
//! domain it belongs to. Strategies run in order and the first one that
//! produces a candidate wins:
//!
//! 1. **exact**: the host equals a registered host key
//! 2. **suffix**: the host is a registered host key or a subdomain of one,
//!    plus every domain sharing the host's registrable domain
//! 3. **contains**: the link (raw or percent-decoded) contains a registered
//!    domain as a bounded substring; catches tracking and redirect URLs
//! 4. **token**: the host or link shares a token with a registered domain
//!
//! Whenever several candidates survive, the one whose path prefix matches
//! the result path is preferred, then the most specific (longest host key,
//! then longest path prefix).

use std::collections::{BTreeSet, HashSet};

use crate::matching::catalog::{CatalogIndex, specificity};
use crate::matching::normalize::{MIN_TOKEN_LEN, path_prefix, root_domain, tokenize};
use crate::models::domain::DomainRecord;
use crate::models::serp_run::MatchType;

/// Outcome of classifying one result.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    pub matched: Option<&'a DomainRecord>,
    pub match_type: MatchType,
}

impl<'a> MatchResult<'a> {
    fn found(domain: &'a DomainRecord, match_type: MatchType) -> Self {
        Self {
            matched: Some(domain),
            match_type,
        }
    }

    fn none() -> Self {
        Self {
            matched: None,
            match_type: MatchType::None,
        }
    }
}

/// Optional cascade steps.
#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    /// Run the substring search over the raw link.
    ///
    /// It can produce false positives on pages that merely mention a
    /// registered domain, so deployments may switch it off.
    pub contains_match: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            contains_match: true,
        }
    }
}

/// Classify with the default options.
pub fn classify<'a>(result_host: &str, result_link: &str, index: &'a CatalogIndex) -> MatchResult<'a> {
    classify_with(result_host, result_link, index, &MatchOptions::default())
}

/// Run the matching cascade for one search result.
///
/// `result_host` is expected to be normalized already. An empty host is
/// unclassifiable and yields `MatchType::None`.
pub fn classify_with<'a>(
    result_host: &str,
    result_link: &str,
    index: &'a CatalogIndex,
    options: &MatchOptions,
) -> MatchResult<'a> {
    if result_host.is_empty() || index.is_empty() {
        return MatchResult::none();
    }

    let result_path = path_prefix(result_link);

    // Exact host
    let exact: Vec<Candidate> = index
        .by_host(result_host)
        .iter()
        .map(|&position| Candidate::new(position, 0))
        .collect();
    if let Some(domain) = select_by_path(index, exact, &result_path) {
        return MatchResult::found(domain, MatchType::Exact);
    }

    // Subdomain of a registered host, or same registrable domain.
    // True suffix matches outrank domains that only share the root.
    let mut suffix: Vec<Candidate> = index
        .most_specific_first()
        .filter(|(_, domain)| is_host_or_subdomain(result_host, domain.host_key()))
        .map(|(position, _)| Candidate::new(position, 1))
        .collect();
    suffix.extend(
        index
            .by_root(&root_domain(result_host))
            .iter()
            .map(|&position| Candidate::new(position, 0)),
    );
    if let Some(domain) = select_by_path(index, dedup(suffix), &result_path) {
        return MatchResult::found(domain, MatchType::Suffix);
    }

    if options.contains_match {
        let haystacks = link_haystacks(result_link);
        let contains: Vec<Candidate> = index
            .most_specific_first()
            .filter(|(_, domain)| {
                needles(domain).iter().any(|needle| {
                    haystacks
                        .iter()
                        .any(|haystack| contains_bounded(haystack, needle))
                })
            })
            .map(|(position, _)| Candidate::new(position, 0))
            .collect();
        // Wrapped destinations carry their own path; the wrapper's path is irrelevant
        let embedded = |domain: &DomainRecord| {
            embedded_path(&haystacks, domain.host_key())
                .is_some_and(|path| path_matches(&domain.path_prefix().to_lowercase(), &path))
        };
        if let Some(domain) = select_best(index, contains, embedded) {
            return MatchResult::found(domain, MatchType::Contains);
        }
    }

    let mut tokens: BTreeSet<String> = tokenize(result_host);
    tokens.extend(tokenize(result_link));
    let token_matches: Vec<Candidate> = tokens
        .iter()
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .flat_map(|token| index.by_token(token).collect::<Vec<_>>())
        .map(|position| Candidate::new(position, 0))
        .collect();
    if let Some(domain) = select_by_path(index, dedup(token_matches), &result_path) {
        return MatchResult::found(domain, MatchType::Token);
    }

    MatchResult::none()
}

/// Index position plus a rank that outweighs specificity.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    position: usize,
    rank: u8,
}

impl Candidate {
    fn new(position: usize, rank: u8) -> Self {
        Self { position, rank }
    }
}

/// Keep the first occurrence of every position.
fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.position))
        .collect()
}

/// Pick the best candidate for a result path.
///
/// Candidates whose path prefix is empty or a segment-aligned prefix of the
/// result path are preferred; when none qualifies every candidate is
/// considered. Among the survivors the highest rank wins, then
/// [`specificity`].
fn select_by_path<'a>(
    index: &'a CatalogIndex,
    candidates: Vec<Candidate>,
    result_path: &str,
) -> Option<&'a DomainRecord> {
    select_best(index, candidates, |domain| {
        path_matches(domain.path_prefix(), result_path)
    })
}

/// Pick the best candidate, preferring those `accepts` allows.
fn select_best<'a>(
    index: &'a CatalogIndex,
    candidates: Vec<Candidate>,
    accepts: impl Fn(&DomainRecord) -> bool,
) -> Option<&'a DomainRecord> {
    if candidates.is_empty() {
        return None;
    }

    let on_path: Vec<Candidate> = candidates
        .iter()
        .copied()
        .filter(|candidate| accepts(index.domain(candidate.position)))
        .collect();
    let pool = if on_path.is_empty() { candidates } else { on_path };

    pool.into_iter()
        .min_by(|a, b| {
            b.rank.cmp(&a.rank).then_with(|| {
                specificity(index.domain(a.position), index.domain(b.position))
            })
        })
        .map(|candidate| index.domain(candidate.position))
}

/// Whether a registered path prefix covers `path`.
///
/// `/shop` covers `/shop` and `/shop/item` but not `/shopping`.
pub fn path_matches(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }

    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn is_host_or_subdomain(host: &str, registered: &str) -> bool {
    host == registered
        || host
            .strip_suffix(registered)
            .is_some_and(|head| head.ends_with('.'))
}

/// Lower-cased link and, when it differs, its percent-decoded form.
fn link_haystacks(link: &str) -> Vec<String> {
    let raw = link.to_lowercase();
    let mut haystacks = Vec::with_capacity(2);

    if let Ok(decoded) = urlencoding::decode(&raw) {
        let decoded = decoded.into_owned();
        if decoded != raw {
            haystacks.push(decoded);
        }
    }
    haystacks.insert(0, raw);
    haystacks
}

/// Path of the first URL embedded in a haystack under `host_key`.
///
/// The decoded haystack is searched first, since an encoded `%2f` hides the
/// path. The path runs from the end of the host up to the next `?`, `&`, `#` or
/// whitespace; a host followed by anything else has the root path.
/// `None` when the host never occurs as a bounded substring.
fn embedded_path(haystacks: &[String], host_key: &str) -> Option<String> {
    if host_key.is_empty() {
        return None;
    }

    haystacks.iter().rev().find_map(|haystack| {
        bounded_matches(haystack, host_key).next().map(|end| {
            let rest = &haystack[end..];
            let segment = rest
                .find(|c: char| matches!(c, '?' | '&' | '#') || c.is_whitespace())
                .map_or(rest, |stop| &rest[..stop]);
            match segment.strip_prefix('/') {
                Some(_) => segment.trim_end_matches('/').to_string(),
                None => String::new(),
            }
        })
    })
}

/// Strings searched for in a link on behalf of one domain.
fn needles(domain: &DomainRecord) -> Vec<String> {
    let mut needles = vec![domain.host_key().to_string()];
    let raw = domain.domain.trim().to_lowercase();
    if !raw.is_empty() && raw != domain.host_key() {
        needles.push(raw);
    }
    needles
}

fn is_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

/// Whether `needle` occurs in `haystack` with no domain character
/// (alphanumeric, `.`, `-`) directly before or after it.
///
/// `notexample.com` and `example.com.evil.net` do not contain `example.com`
/// in this sense; `?u=https://example.com/x` does.
pub fn contains_bounded(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    bounded_matches(haystack, needle).next().is_some()
}

/// End offsets of every bounded occurrence of `needle` in `haystack`.
fn bounded_matches<'h>(haystack: &'h str, needle: &'h str) -> impl Iterator<Item = usize> + 'h {
    haystack
        .match_indices(needle)
        .filter(move |(start, _)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + needle.len()..].chars().next();
            !before.is_some_and(is_domain_char) && !after.is_some_and(is_domain_char)
        })
        .map(move |(start, _)| start + needle.len())
}
