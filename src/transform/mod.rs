//! Shapes user-confirmed metrics and test settings into the backend request,
//! and folds display metadata back into the results.

pub mod enrich;
pub mod validation;

use crate::analysis::{CorrectionMethod, DataType, StatisticalMethod};
use crate::api::{AnalysisRequest, DimensionFilters, MetricConfig, WireMetricType};
use crate::error::{AnalysisError, Result};
use crate::metrics::{AnalysisMetric, CurrencySymbol, MetricKind, MetricUnit};
use crate::normalize::{normalize_column_name, normalize_dataset};
use crate::types::Dataset;

pub use enrich::enrich_results;
pub use validation::{detect_user_column, preflight_dataset, validate_data, ValidationReport};

/// Optional knobs of [`prepare_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareOptions {
    pub user_column: Option<String>,
    pub confidence_level: f64,
    pub statistical_method: StatisticalMethod,
    pub correction: CorrectionMethod,
    pub data_type: DataType,
    pub filters: Option<DimensionFilters>,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            user_column: None,
            confidence_level: 95.0,
            statistical_method: StatisticalMethod::Frequentist,
            correction: CorrectionMethod::Uncorrected,
            data_type: DataType::Aggregated,
            filters: None,
        }
    }
}

fn normalized(column: Option<&String>) -> Option<String> {
    column.map(|c| normalize_column_name(c))
}

fn wire_type(metric: &AnalysisMetric) -> WireMetricType {
    match metric.kind {
        MetricKind::Binary => WireMetricType::Conversion,
        MetricKind::Continuous if metric.is_revenue || metric.unit == MetricUnit::Currency => {
            WireMetricType::Revenue
        }
        MetricKind::Continuous
            if metric.secondary_value_column.is_some()
                || (metric.numerator.is_some() && metric.denominator.is_some()) =>
        {
            WireMetricType::Ratio
        }
        MetricKind::Continuous => WireMetricType::Count,
    }
}

fn transform_metric(metric: &AnalysisMetric) -> MetricConfig {
    let metric_type = wire_type(metric);

    let (main, numerator, denominator) = match metric.kind {
        MetricKind::Binary => (
            metric.numerator.as_ref().or(metric.value_column.as_ref()),
            normalized(metric.numerator.as_ref()),
            normalized(metric.denominator.as_ref()),
        ),
        MetricKind::Continuous => {
            if metric.secondary_value_column.is_some() {
                (
                    metric.value_column.as_ref(),
                    normalized(metric.value_column.as_ref()),
                    normalized(metric.secondary_value_column.as_ref()),
                )
            } else if let (Some(num), Some(den)) = (&metric.numerator, &metric.denominator) {
                (
                    Some(num),
                    Some(normalize_column_name(num)),
                    Some(normalize_column_name(den)),
                )
            } else {
                (metric.value_column.as_ref().or(metric.numerator.as_ref()), None, None)
            }
        }
    };

    let currency = metric
        .currency
        .or(metric.is_revenue.then_some(CurrencySymbol::Euro));
    let description = if metric.description.is_empty() {
        format!("{} metric", metric.name)
    } else {
        metric.description.clone()
    };

    MetricConfig {
        name: metric.name.clone(),
        column: normalized(main).unwrap_or_default(),
        metric_type,
        description: Some(description),
        numerator_column: numerator,
        denominator_column: denominator,
        filters: metric.filters.clone(),
        unit: Some(metric.unit.as_str().to_string()),
        currency: currency.map(|c| c.to_string()),
        decimals: Some(metric.decimals),
    }
}

/// Maps confirmed metrics to backend metric configs, normalizing every column.
pub fn transform_metrics(metrics: &[AnalysisMetric]) -> Vec<MetricConfig> {
    metrics.iter().map(transform_metric).collect()
}

/// Builds the request for `POST /api/analyze`.
///
/// Fails with [`AnalysisError::Validation`] listing every structural problem
/// in `data`. When no user column is given one is looked up among id-like
/// columns.
pub fn prepare_config(
    data: &Dataset,
    metrics: &[AnalysisMetric],
    variation_column: &str,
    options: PrepareOptions,
) -> Result<AnalysisRequest> {
    let report = validate_data(data, options.data_type);
    if !report.is_valid() {
        return Err(AnalysisError::Validation {
            errors: report.errors,
        });
    }

    let user_column = options.user_column.or_else(|| detect_user_column(data));

    Ok(AnalysisRequest {
        data: normalize_dataset(data),
        metrics_config: transform_metrics(metrics),
        variation_column: normalize_column_name(variation_column),
        user_column: normalized(user_column.as_ref()),
        data_type: options.data_type,
        confidence_level: options.confidence_level,
        statistical_method: options.statistical_method,
        multiple_testing_correction: options.correction,
        filters: options.filters,
    })
}
