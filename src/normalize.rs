//! Canonical column naming shared by detection, request building and result
//! enrichment.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Dataset, Row};

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\-.]+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").unwrap());

/// Lowercase, separators collapsed to `_`, anything outside ASCII
/// `[A-Za-z0-9_]` dropped.
///
/// `normalize_column_name("Revenue - Per User.1") == "revenue_per_user_1"`
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let joined = SEPARATORS.replace_all(&lowered, "_");
    NON_WORD.replace_all(&joined, "").into_owned()
}

/// Rewrites every key of `row`. On collision the later column wins but keeps
/// the position of the first one.
pub fn normalize_row_keys(row: &Row) -> Row {
    let mut out = Row::with_capacity(row.len());
    for (key, value) in row {
        out.insert(normalize_column_name(key), value.clone());
    }
    out
}

pub fn normalize_dataset(data: &Dataset) -> Dataset {
    data.rows().iter().map(normalize_row_keys).collect()
}
