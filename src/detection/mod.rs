//! Heuristic metric and dimension detection over imported tables.
//!
//! Everything here is driven by column names, plus light sampling of values
//! for currency and numeric checks. Output order follows column order, so the
//! same input always yields the same suggestions.

pub mod currency;
pub mod quality;
pub mod templates;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::metrics::{CurrencySymbol, DetectedMetric};
use crate::normalize::normalize_column_name;
use crate::types::{CellValue, Dataset};

pub use currency::{detect_currency, REVENUE_KEYWORDS};
pub use quality::{calculate_data_quality, is_numeric_column, DataQuality};
pub use templates::enhance_metric_detection;

const USER_KEYWORDS: &[&str] = &[
    "user",
    "visitor",
    "customer",
    "client",
    "session",
    "unique",
    "utilisateur",
    "visiteur",
    "besucher",
    "usuario",
];

const VARIATION_KEYWORDS: &[&str] = &["variation", "variant", "group", "test"];

const CATEGORICAL_KEYWORDS: &[&str] = &[
    "device", "category", "country", "browser", "source", "campaign", "product",
];

const TEMPORAL_KEYWORDS: &[&str] = &["date", "day", "week", "month", "timestamp"];

const SAMPLE_VALUE_LIMIT: usize = 5;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
    Categorical,
    Temporal,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedDimension {
    pub name: String,
    pub column: String,
    #[serde(rename = "type")]
    pub kind: DimensionKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_values: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<CellValue>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub suggested_metrics: Vec<DetectedMetric>,
    pub dimensions: Vec<DetectedDimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_detected: Option<CurrencySymbol>,
    pub data_quality: DataQuality,
}

impl DetectionResult {
    pub fn has_metric(&self, name: &str) -> bool {
        self.suggested_metrics.iter().any(|m| m.name == name)
    }

    pub fn metric(&self, name: &str) -> Option<&DetectedMetric> {
        self.suggested_metrics.iter().find(|m| m.name == name)
    }
}

struct Pattern {
    re: Regex,
    name: &'static str,
    description: &'static str,
}

fn patterns(defs: &[(&str, &'static str, &'static str)]) -> Vec<Pattern> {
    defs.iter()
        .map(|&(re, name, description)| Pattern {
            re: Regex::new(&format!("(?i){}", re)).unwrap(),
            name,
            description,
        })
        .collect()
}

static CONVERSION_PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    patterns(&[
        ("user_pdp_view", "PDP View Rate", "Product detail page view conversion rate"),
        ("user_add_to_cart", "Add to Cart Rate", "Add to cart conversion rate"),
        ("user_begin_checkout", "Begin Checkout Rate", "Checkout initiation rate"),
        ("user_purchase", "Purchase Conversion Rate", "Purchase conversion rate"),
        ("user_signup", "Signup Rate", "User registration rate"),
        ("user_subscription", "Subscription Rate", "Subscription conversion rate"),
    ])
});

static REVENUE_PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    patterns(&[
        ("^revenue$", "Revenue", "Total revenue"),
        ("gross_revenue", "Gross Revenue", "Total gross revenue"),
        ("net_revenue", "Net Revenue", "Total net revenue"),
        ("gross_margin", "Gross Margin", "Total gross margin"),
    ])
});

static COUNT_PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    patterns(&[
        ("^purchases$", "Total Purchases", "Total number of purchases"),
        ("^quantity$", "Total Quantity Sold", "Total quantity of items sold"),
        ("matched_orders", "Matched Orders", "Number of matched orders"),
    ])
});

/// (name, numerator, denominator, description). Both columns must exist.
const FUNNEL_METRICS: &[(&str, &str, &str, &str)] = &[
    (
        "Cart to Purchase Rate",
        "user_purchases",
        "user_add_to_cart",
        "Conversion rate from cart to purchase",
    ),
    (
        "Checkout to Purchase Rate",
        "user_purchases",
        "user_begin_checkout",
        "Conversion rate from checkout to purchase",
    ),
    (
        "PDP to Cart Rate",
        "user_add_to_cart",
        "user_pdp_views",
        "Conversion rate from PDP view to cart",
    ),
];

static REVENUE_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)revenue").unwrap());
static PURCHASE_COLUMN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)purchase").unwrap());

fn first_containing(columns: &[String], keywords: &[&str]) -> Option<String> {
    columns
        .iter()
        .find(|c| {
            let lower = c.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .cloned()
}

/// Suggests metrics, dimensions and key columns for `data`.
pub fn detect_metrics(data: &Dataset) -> DetectionResult {
    if data.is_empty() {
        return DetectionResult {
            data_quality: DataQuality {
                score: 0.0,
                warnings: vec!["No data provided".to_string()],
            },
            ..Default::default()
        };
    }

    let columns = data.columns();
    let mut result = DetectionResult {
        user_column: first_containing(&columns, USER_KEYWORDS),
        variation_column: first_containing(&columns, VARIATION_KEYWORDS),
        ..Default::default()
    };

    detect_conversions(&columns, &mut result);
    detect_revenue(data, &columns, &mut result);
    detect_ratios(data, &columns, &mut result);
    detect_counts(&columns, &mut result);
    detect_funnels(&columns, &mut result);
    result.dimensions = detect_dimensions(data, &columns);
    result.data_quality = calculate_data_quality(data);

    tracing::debug!(
        rows = data.len(),
        metrics = result.suggested_metrics.len(),
        dimensions = result.dimensions.len(),
        "detected metrics"
    );
    result
}

fn detect_conversions(columns: &[String], result: &mut DetectionResult) {
    let denominator = result.user_column.as_deref().unwrap_or("users").to_string();
    for pattern in CONVERSION_PATTERNS.iter() {
        for column in columns.iter().filter(|c| pattern.re.is_match(c)) {
            result.suggested_metrics.push(DetectedMetric::rate(
                pattern.name,
                column,
                &denominator,
                pattern.description,
            ));
        }
    }
}

fn detect_revenue(data: &Dataset, columns: &[String], result: &mut DetectionResult) {
    for pattern in REVENUE_PATTERNS.iter() {
        for column in columns.iter().filter(|c| pattern.re.is_match(c)) {
            let detected = detect_currency(data, column);
            if result.currency_detected.is_none() {
                result.currency_detected = detected;
            }
            result.suggested_metrics.push(DetectedMetric::revenue(
                pattern.name,
                column,
                detected.unwrap_or(CurrencySymbol::Euro),
                pattern.description,
            ));
        }
    }
}

fn detect_ratios(data: &Dataset, columns: &[String], result: &mut DetectionResult) {
    let Some(revenue) = columns.iter().find(|c| REVENUE_COLUMN.is_match(c)) else {
        return;
    };
    let currency = detect_currency(data, revenue).unwrap_or(CurrencySymbol::Euro);

    let purchases = columns
        .iter()
        .find(|c| PURCHASE_COLUMN.is_match(c) && !c.to_lowercase().contains("user_"));
    if let Some(purchases) = purchases {
        result.suggested_metrics.push(DetectedMetric::revenue_ratio(
            "Average Order Value (AOV)",
            revenue,
            purchases,
            currency,
            "Average revenue per order",
        ));
    }

    if let Some(users) = result.user_column.clone() {
        result.suggested_metrics.push(DetectedMetric::revenue_ratio(
            "Revenue per User (RPU)",
            revenue,
            &users,
            currency,
            "Average revenue per user",
        ));
    }
}

fn detect_counts(columns: &[String], result: &mut DetectionResult) {
    for pattern in COUNT_PATTERNS.iter() {
        for column in columns.iter().filter(|c| pattern.re.is_match(c)) {
            result.suggested_metrics.push(DetectedMetric::count(
                pattern.name,
                column,
                pattern.description,
            ));
        }
    }
}

fn detect_funnels(columns: &[String], result: &mut DetectionResult) {
    let present = |name: &str| columns.iter().any(|c| c.eq_ignore_ascii_case(name));
    for (name, numerator, denominator, description) in FUNNEL_METRICS {
        if present(*numerator) && present(*denominator) {
            result.suggested_metrics.push(DetectedMetric::rate(
                *name,
                numerator,
                denominator,
                *description,
            ));
        }
    }
}

fn dimension_name(column: &str) -> String {
    let spaced = column.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn build_dimension(data: &Dataset, column: &str, kind: DimensionKind) -> DetectedDimension {
    let mut distinct: IndexSet<String> = IndexSet::new();
    let mut samples: Vec<CellValue> = Vec::new();
    for cell in data.column_values(column).filter(|c| !c.is_missing()) {
        if distinct.insert(cell.to_string()) && samples.len() < SAMPLE_VALUE_LIMIT {
            samples.push(cell.clone());
        }
    }
    let name = dimension_name(column);
    DetectedDimension {
        description: format!("{} for filtering and segmentation", name),
        name,
        column: column.to_string(),
        kind,
        unique_values: Some(distinct.len()),
        sample_values: Some(samples),
    }
}

fn detect_dimensions(data: &Dataset, columns: &[String]) -> Vec<DetectedDimension> {
    let mut dimensions = Vec::new();
    for column in columns {
        let lower = column.to_lowercase();
        let kind = if CATEGORICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            DimensionKind::Categorical
        } else if TEMPORAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            DimensionKind::Temporal
        } else {
            continue;
        };
        dimensions.push(build_dimension(data, column, kind));
    }
    dimensions
}

// ── Column profiling ──

/// Per-column summary shown when choosing which columns to keep.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    pub name: String,
    pub normalized_name: String,
    pub is_numeric: bool,
    pub missing: usize,
    pub distinct: usize,
}

pub fn profile_columns(data: &Dataset) -> Vec<ColumnProfile> {
    data.columns()
        .into_iter()
        .map(|column| {
            let mut distinct: IndexSet<String> = IndexSet::new();
            let mut missing = 0;
            for row in data.rows() {
                match row.get(&column) {
                    Some(cell) if !cell.is_missing() => {
                        distinct.insert(cell.to_string());
                    }
                    _ => missing += 1,
                }
            }
            ColumnProfile {
                normalized_name: normalize_column_name(&column),
                is_numeric: is_numeric_column(data, &column),
                missing,
                distinct: distinct.len(),
                name: column,
            }
        })
        .collect()
}
