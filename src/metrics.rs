use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Binary,
    Continuous,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricUnit {
    Currency,
    Percentage,
    Count,
    Duration,
    #[default]
    #[serde(rename = "none")]
    Unitless,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Currency => "currency",
            MetricUnit::Percentage => "percentage",
            MetricUnit::Count => "count",
            MetricUnit::Duration => "duration",
            MetricUnit::Unitless => "none",
        }
    }

    /// Display precision used when a metric carries no explicit decimals.
    pub fn default_decimals(&self) -> u32 {
        match self {
            MetricUnit::Count => 0,
            _ => 2,
        }
    }
}

/// Currencies recognised in column names and cell values.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CurrencySymbol {
    #[serde(rename = "€")]
    Euro,
    #[serde(rename = "$")]
    Dollar,
    #[serde(rename = "£")]
    Pound,
    #[serde(rename = "¥")]
    Yen,
    #[serde(rename = "kr")]
    Krona,
    #[serde(rename = "CHF")]
    Franc,
}

impl CurrencySymbol {
    pub fn symbol(&self) -> &'static str {
        match self {
            CurrencySymbol::Euro => "€",
            CurrencySymbol::Dollar => "$",
            CurrencySymbol::Pound => "£",
            CurrencySymbol::Yen => "¥",
            CurrencySymbol::Krona => "kr",
            CurrencySymbol::Franc => "CHF",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "€" => Some(CurrencySymbol::Euro),
            "$" => Some(CurrencySymbol::Dollar),
            "£" => Some(CurrencySymbol::Pound),
            "¥" => Some(CurrencySymbol::Yen),
            "kr" => Some(CurrencySymbol::Krona),
            "CHF" => Some(CurrencySymbol::Franc),
            _ => None,
        }
    }
}

impl fmt::Display for CurrencySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A metric suggested by the detector from column names.
///
/// Binary metrics always carry a `numerator`; continuous metrics carry a
/// `value_column` or a `numerator`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedMetric {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_column: Option<String>,
    #[serde(
        default,
        rename = "valueColumn2",
        skip_serializing_if = "Option::is_none"
    )]
    pub secondary_value_column: Option<String>,
    pub description: String,
    #[serde(default)]
    pub unit: MetricUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencySymbol>,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub is_revenue: bool,
    #[serde(default)]
    pub suggested_format: String,
}

impl DetectedMetric {
    /// Bare metric of the given kind; the detector fills in the rest.
    pub fn new(name: impl Into<String>, kind: MetricKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            numerator: None,
            denominator: None,
            value_column: None,
            secondary_value_column: None,
            description: description.into(),
            unit: MetricUnit::Unitless,
            currency: None,
            decimals: 2,
            is_revenue: false,
            suggested_format: "{value}".to_string(),
        }
    }

    /// Binary rate `numerator / denominator`, rendered as a percentage.
    pub fn rate(
        name: impl Into<String>,
        numerator: &str,
        denominator: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            numerator: Some(numerator.to_string()),
            denominator: Some(denominator.to_string()),
            unit: MetricUnit::Percentage,
            decimals: 2,
            suggested_format: "{value}%".to_string(),
            ..Self::new(name, MetricKind::Binary, description)
        }
    }

    /// Continuous monetary metric over a single column.
    pub fn revenue(
        name: impl Into<String>,
        column: &str,
        currency: CurrencySymbol,
        description: impl Into<String>,
    ) -> Self {
        Self {
            value_column: Some(column.to_string()),
            unit: MetricUnit::Currency,
            currency: Some(currency),
            decimals: 2,
            is_revenue: true,
            suggested_format: format!("{}{{value}}", currency.symbol()),
            ..Self::new(name, MetricKind::Continuous, description)
        }
    }

    /// Continuous monetary ratio `numerator / denominator`.
    pub fn revenue_ratio(
        name: impl Into<String>,
        numerator: &str,
        denominator: &str,
        currency: CurrencySymbol,
        description: impl Into<String>,
    ) -> Self {
        Self {
            numerator: Some(numerator.to_string()),
            denominator: Some(denominator.to_string()),
            secondary_value_column: Some(denominator.to_string()),
            ..Self::revenue(name, numerator, currency, description)
        }
    }

    /// Continuous integer count over a single column.
    pub fn count(name: impl Into<String>, column: &str, description: impl Into<String>) -> Self {
        Self {
            value_column: Some(column.to_string()),
            unit: MetricUnit::Count,
            decimals: 0,
            suggested_format: "{value} items".to_string(),
            ..Self::new(name, MetricKind::Continuous, description)
        }
    }

    /// Whether the metric has the columns its kind requires.
    pub fn has_required_columns(&self) -> bool {
        match self.kind {
            MetricKind::Binary => self.numerator.is_some(),
            MetricKind::Continuous => self.value_column.is_some() || self.numerator.is_some(),
        }
    }

    /// Every column this metric reads, in declaration order.
    pub fn referenced_columns(&self) -> Vec<&str> {
        [
            &self.numerator,
            &self.denominator,
            &self.value_column,
            &self.secondary_value_column,
        ]
        .into_iter()
        .filter_map(|c| c.as_deref())
        .collect()
    }
}

/// Per-metric filters, dimension column → accepted values or an arbitrary
/// expression understood by the backend.
pub type MetricFilters = IndexMap<String, serde_json::Value>;

/// A metric the user confirmed or authored for a run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetric {
    pub id: String,
    #[serde(flatten)]
    pub metric: DetectedMetric,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<MetricFilters>,
}

impl AnalysisMetric {
    pub fn from_detected(metric: DetectedMetric) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metric,
            is_custom: false,
            filters: None,
        }
    }

    pub fn custom(metric: DetectedMetric) -> Self {
        Self {
            is_custom: true,
            ..Self::from_detected(metric)
        }
    }

    pub fn with_filters(mut self, filters: MetricFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn name(&self) -> &str {
        &self.metric.name
    }
}

impl std::ops::Deref for AnalysisMetric {
    type Target = DetectedMetric;

    fn deref(&self) -> &DetectedMetric {
        &self.metric
    }
}
