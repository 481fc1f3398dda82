//! Host and domain normalization.
//!
//! Every comparison the classifier makes goes through these functions, so a
//! registered domain and a search-result link always end up in the same
//! canonical shape:
//!
//! - `host_key`: lower-cased hostname without a leading `www.`
//! - `root_key`: registrable domain according to the Public Suffix List
//! - `path_prefix`: URL path without trailing slashes (`""` for `/`)
//! - tokens: lower-cased word fragments of at least [`MIN_TOKEN_LEN`] chars

use std::collections::BTreeSet;
use url::Url;

/// Shortest token kept by [`tokenize`].
///
/// Fragments such as `id`, `co` or `com` appear in almost every hostname
/// and would match everything.
pub const MIN_TOKEN_LEN: usize = 4;

/// Derived lookup keys for one registered domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainKeys {
    pub host_key: String,
    pub root_key: String,
    pub path_prefix: String,
    /// Sorted and deduplicated
    pub tokens: Vec<String>,
}

/// Parse a bare domain or a full URL.
///
/// The input is trimmed and lower-cased; `https://` is assumed when no
/// scheme is present.
fn parse_lenient(input: &str) -> Option<Url> {
    let value = input.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }

    if value.contains("://") {
        Url::parse(&value).ok()
    } else {
        Url::parse(&format!("https://{value}")).ok()
    }
}

/// Canonical hostname of a domain string or URL.
///
/// Returns an empty string when the input cannot be parsed or has no host.
///
/// # Examples
///
/// ```
/// use serp_rank_tracker::matching::normalize::normalize_host;
///
/// assert_eq!(normalize_host("https://WWW.Example.com/shop"), "example.com");
/// assert_eq!(normalize_host("shop.example.co.id"), "shop.example.co.id");
/// assert_eq!(normalize_host("::not a url::"), "");
/// ```
pub fn normalize_host(input: &str) -> String {
    let Some(parsed) = parse_lenient(input) else {
        return String::new();
    };

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

/// Registrable domain of a host key (`shop.example.co.id` -> `example.co.id`).
///
/// Falls back to the host itself when the suffix list cannot classify it
/// (IP addresses, single labels, unknown suffixes).
pub fn root_domain(host_key: &str) -> String {
    if host_key.is_empty() {
        return String::new();
    }

    match psl::domain_str(host_key) {
        Some(domain) => domain.to_lowercase(),
        None => host_key.to_string(),
    }
}

/// Path of a domain string or URL with trailing slashes removed.
///
/// The root path `/` and unparseable input both yield `""`.
pub fn path_prefix(input: &str) -> String {
    let Some(parsed) = parse_lenient(input) else {
        return String::new();
    };

    parsed.path().trim_end_matches('/').to_string()
}

/// Split a value into lower-cased tokens of at least [`MIN_TOKEN_LEN`] characters.
pub fn tokenize(value: &str) -> BTreeSet<String> {
    let cleaned: String = value
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split(|c: char| c == '.' || c == '-' || c == '_' || c.is_whitespace())
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Compose every derived key of a registered domain.
///
/// The token set pools the raw string, the host key, the root key and the
/// owning brand's code, so a brand's short name is also a matching signal.
/// The scheme of a URL-shaped registration never becomes a token.
pub fn build_domain_keys(domain: &str, brand_code: &str) -> DomainKeys {
    let host_key = normalize_host(domain);
    let root_key = root_domain(&host_key);
    let path_prefix = if host_key.is_empty() {
        String::new()
    } else {
        path_prefix(domain)
    };

    let without_scheme = domain
        .split_once("://")
        .map_or(domain, |(_, rest)| rest);

    let mut tokens = tokenize(without_scheme);
    tokens.extend(tokenize(&host_key));
    tokens.extend(tokenize(&root_key));
    tokens.extend(tokenize(brand_code));

    DomainKeys {
        host_key,
        root_key,
        path_prefix,
        tokens: tokens.into_iter().collect(),
    }
}
