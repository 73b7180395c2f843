//! Generic metric templates applied on top of the column-pattern detector.

use once_cell::sync::Lazy;
use regex::Regex;

use super::currency::detect_currency;
use super::DetectionResult;
use crate::metrics::{CurrencySymbol, DetectedMetric, MetricKind, MetricUnit};
use crate::types::Dataset;

pub struct MetricTemplate {
    pub name: &'static str,
    pub kind: MetricKind,
    pub unit: MetricUnit,
    pub is_revenue: bool,
    pub description: &'static str,
    pattern: Regex,
}

impl MetricTemplate {
    fn new(
        name: &'static str,
        pattern: &str,
        kind: MetricKind,
        unit: MetricUnit,
        is_revenue: bool,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            unit,
            is_revenue,
            description,
            pattern: Regex::new(&format!("(?i){}", pattern)).unwrap(),
        }
    }

    pub fn matches(&self, column: &str) -> bool {
        self.pattern.is_match(column)
    }
}

pub static METRIC_TEMPLATES: Lazy<Vec<MetricTemplate>> = Lazy::new(|| {
    vec![
        MetricTemplate::new(
            "Conversion Rate",
            "conversion|purchase|order|transaction",
            MetricKind::Binary,
            MetricUnit::Percentage,
            false,
            "Percentage of users who converted",
        ),
        MetricTemplate::new(
            "Revenue per User",
            "revenue.*user|rpu|arpu",
            MetricKind::Continuous,
            MetricUnit::Currency,
            true,
            "Average revenue generated per user",
        ),
        MetricTemplate::new(
            "Average Order Value",
            "average.*order|aov|basket|panier",
            MetricKind::Continuous,
            MetricUnit::Currency,
            true,
            "Average value per order",
        ),
        MetricTemplate::new(
            "Click-through Rate",
            r"click.*rate|ctr",
            MetricKind::Binary,
            MetricUnit::Percentage,
            false,
            "Percentage of users who clicked",
        ),
        MetricTemplate::new(
            "Items per Cart",
            r"items|quantity|cart.*size",
            MetricKind::Continuous,
            MetricUnit::Count,
            false,
            "Average number of items per cart",
        ),
    ]
});

static AOV_REVENUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)revenue|sales|amount").unwrap());
static AOV_ORDERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)order|purchase|transaction").unwrap());

const AVERAGE_ORDER_VALUE: &str = "Average Order Value";

fn from_template(
    template: &MetricTemplate,
    data: &Dataset,
    column: &str,
    user_column: Option<&str>,
) -> DetectedMetric {
    let currency = if template.is_revenue {
        Some(detect_currency(data, column).unwrap_or(CurrencySymbol::Euro))
    } else {
        None
    };
    let suggested_format = match (template.unit, currency) {
        (MetricUnit::Percentage, _) => "{value}%".to_string(),
        (MetricUnit::Currency, c) => format!(
            "{}{{value}}",
            c.unwrap_or(CurrencySymbol::Euro).symbol()
        ),
        _ => "{value}".to_string(),
    };
    let binary = template.kind == MetricKind::Binary;

    DetectedMetric {
        numerator: binary.then(|| column.to_string()),
        denominator: if binary {
            user_column.map(str::to_string)
        } else {
            None
        },
        value_column: (!binary).then(|| column.to_string()),
        unit: template.unit,
        currency,
        decimals: template.unit.default_decimals(),
        is_revenue: template.is_revenue,
        suggested_format,
        ..DetectedMetric::new(template.name, template.kind, template.description)
    }
}

/// Adds template metrics and a generic average order value to `result`.
///
/// Each template binds to the first matching column and is skipped when a
/// metric with the same name already exists.
pub fn enhance_metric_detection(data: &Dataset, mut result: DetectionResult) -> DetectionResult {
    let columns = data.columns();

    for template in METRIC_TEMPLATES.iter() {
        let Some(column) = columns.iter().find(|c| template.matches(c)) else {
            continue;
        };
        if result.has_metric(template.name) {
            continue;
        }
        let metric = from_template(template, data, column, result.user_column.as_deref());
        result.suggested_metrics.push(metric);
    }

    let revenue = columns.iter().find(|c| AOV_REVENUE.is_match(c));
    let orders = columns.iter().find(|c| AOV_ORDERS.is_match(c));
    if let (Some(revenue), Some(orders)) = (revenue, orders) {
        if !result.has_metric(AVERAGE_ORDER_VALUE) {
            let currency = detect_currency(data, revenue).unwrap_or(CurrencySymbol::Euro);
            let mut metric = DetectedMetric::revenue(
                AVERAGE_ORDER_VALUE,
                revenue,
                currency,
                "Average revenue per order",
            );
            metric.secondary_value_column = Some(orders.clone());
            result.suggested_metrics.push(metric);
        }
    }

    result
}
