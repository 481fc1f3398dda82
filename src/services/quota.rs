//! Quota hints and remaining-quota estimation.
//!
//! Providers report remaining quota inconsistently: some send a header,
//! some a body field, many nothing at all. Extraction walks a fixed list of
//! known locations and the first parseable value wins. Estimation then
//! prefers operator ground truth over arithmetic over provider hints.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::models::api_key::ApiKey;

/// Where a remaining-quota value may be found in a provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaField {
    /// Response header, lower-case name
    Header(&'static str),
    /// Top-level field of the JSON body
    Body(&'static str),
}

/// Known quota locations, most trusted first.
///
/// Monthly scopes come before shorter ones when a provider exposes several.
pub const QUOTA_FIELDS: &[QuotaField] = &[
    QuotaField::Header("x-ratelimit-remaining-month"),
    QuotaField::Header("x-ratelimit-remaining"),
    QuotaField::Header("x-ratelimit-requests-remaining"),
    QuotaField::Header("x-ratelimit-remaining-searches"),
    QuotaField::Header("x-ratelimit-remaining-day"),
    QuotaField::Header("x-api-quota-remaining"),
    QuotaField::Header("x-credits-remaining"),
    QuotaField::Body("remaining"),
    QuotaField::Body("remainingCredits"),
    QuotaField::Body("creditsRemaining"),
    QuotaField::Body("searchCreditsRemaining"),
    QuotaField::Body("credits"),
];

impl QuotaField {
    fn read(&self, headers: &HashMap<String, String>, body: &serde_json::Value) -> Option<i64> {
        match self {
            QuotaField::Header(name) => headers.get(*name).and_then(|value| parse_numeric_like(value)),
            QuotaField::Body(name) => body.get(*name).and_then(numeric_value),
        }
    }
}

/// First remaining-quota value found in a response, if any.
pub fn extract_remaining(headers: &HashMap<String, String>, body: &serde_json::Value) -> Option<i64> {
    QUOTA_FIELDS
        .iter()
        .find_map(|field| field.read(headers, body))
}

fn numeric_value(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(text) => parse_numeric_like(text),
        _ => None,
    }
}

/// First number embedded in a string: `"2,431 left"` is read as `2`,
/// `"remaining=17"` as `17`, `"-3.5"` as `-3`.
pub fn parse_numeric_like(text: &str) -> Option<i64> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let negative = start > 0 && bytes[start - 1] == b'-';
    let end = bytes[start..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |offset| start + offset);

    let value: i64 = text[start..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Midnight UTC on the first day of `now`'s month.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Usage counts feeding [`estimate_remaining`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyUsage {
    /// Attempts since the key's baseline was captured
    pub since_baseline: i64,
    /// Attempts since the start of the current month
    pub this_month: i64,
}

/// Remaining quota to display for a key.
///
/// 1. operator baseline minus attempts made since it was captured
/// 2. monthly limit minus attempts made this month
/// 3. whatever the provider last reported
///
/// Estimates never go below zero.
pub fn estimate_remaining(key: &ApiKey, monthly_limit: Option<i64>, usage: KeyUsage) -> Option<i64> {
    if let (Some(baseline), Some(_)) = (key.baseline_remaining, key.baseline_captured_at) {
        return Some((baseline - usage.since_baseline).max(0));
    }

    if let Some(limit) = monthly_limit {
        return Some((limit - usage.this_month).max(0));
    }

    key.last_known_remaining
}
