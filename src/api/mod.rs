//! Wire types of the analysis backend and the HTTP client that speaks them.
//!
//! Field names are snake_case and enum values lowercase on the wire.

pub mod client;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{CorrectionMethod, DataType, StatisticalMethod};
use crate::metrics::MetricFilters;
use crate::types::Dataset;

pub use client::AnalysisApiClient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("API request failed: {message}")]
    Http { status: u16, message: String },

    #[error("API request failed: {0}")]
    Network(String),

    #[error("API request failed: invalid response body: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Dimension filters: column → values to keep.
pub type DimensionFilters = IndexMap<String, Vec<String>>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WireMetricType {
    Conversion,
    Revenue,
    Count,
    Ratio,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetricConfig {
    pub name: String,
    pub column: String,
    #[serde(rename = "type")]
    pub metric_type: WireMetricType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numerator_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denominator_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<MetricFilters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
}

/// Body of `POST /api/analyze`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisRequest {
    pub data: Dataset,
    pub metrics_config: Vec<MetricConfig>,
    pub variation_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_column: Option<String>,
    pub data_type: DataType,
    pub confidence_level: f64,
    pub statistical_method: StatisticalMethod,
    pub multiple_testing_correction: CorrectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<DimensionFilters>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StartAnalysisResponse {
    pub job_id: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JobStatus {
    pub job_id: String,
    pub status: JobState,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VariationStats {
    pub variation: String,
    pub sample_size: u64,
    pub mean: f64,
    pub std: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_revenue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_per_user: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StatisticalTest {
    pub test_type: String,
    pub statistic: f64,
    pub p_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_size: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConfidenceInterval {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence_level: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PairwiseComparison {
    pub variation_name: String,
    pub control_stats: VariationStats,
    pub variation_stats: VariationStats,
    pub absolute_uplift: f64,
    pub relative_uplift: f64,
    pub statistical_test: StatisticalTest,
    pub confidence_interval: ConfidenceInterval,
    pub is_significant: bool,
    pub p_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_size: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MetricResult {
    pub metric_name: String,
    pub metric_type: WireMetricType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_decimals: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_is_revenue: Option<bool>,
    #[serde(default)]
    pub variation_stats: Vec<VariationStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_stats: Option<VariationStats>,
    #[serde(default)]
    pub pairwise_comparisons: Vec<PairwiseComparison>,
    pub is_significant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_detectable_effect: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistical_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_ratio_mismatch: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VariationBreakdown {
    pub variation_name: String,
    pub user_count: u64,
    pub percentage: f64,
    pub is_control: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OverallResults {
    pub total_users: u64,
    #[serde(default)]
    pub variation_breakdown: Vec<VariationBreakdown>,
    pub data_quality_score: f64,
    #[serde(default)]
    pub missing_data_percentage: f64,
    pub correction_applied: CorrectionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_alpha: Option<f64>,
    pub significant_metrics: u32,
    pub total_metrics: u32,
    pub total_variations: u32,
}

/// Distinct values of a dimension column, as reported by the backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DimensionColumn {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
    #[serde(default)]
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AnalysisResults {
    pub overall_results: OverallResults,
    pub metric_results: Vec<MetricResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_duration_seconds: Option<f64>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension_columns: Option<IndexMap<String, DimensionColumn>>,
}

impl AnalysisResults {
    pub fn metric(&self, name: &str) -> Option<&MetricResult> {
        self.metric_results.iter().find(|m| m.metric_name == name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GetResultsResponse {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    pub results: AnalysisResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Body of `POST /api/analyze/filter`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FilterRequest {
    pub job_id: String,
    pub filters: DimensionFilters,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FilterJob {
    pub job_id: String,
    pub parent_job_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_job_state_is_tolerated() {
        let s: JobStatus = serde_json::from_value(json!({
            "job_id": "j1",
            "status": "paused",
            "created_at": "2024-01-01T00:00:00"
        }))
        .unwrap();
        assert_eq!(s.status, JobState::Unknown);
    }

    #[test]
    fn test_job_status_with_progress() {
        let s: JobStatus = serde_json::from_value(json!({
            "job_id": "j1",
            "status": "processing",
            "created_at": "2024-01-01T00:00:00",
            "progress_percentage": 40.0
        }))
        .unwrap();
        assert_eq!(s.status, JobState::Processing);
        assert_eq!(s.progress_percentage, Some(40.0));
    }

    #[test]
    fn test_metric_config_omits_absent_fields() {
        let m = MetricConfig {
            name: "Revenue".into(),
            column: "revenue".into(),
            metric_type: WireMetricType::Revenue,
            description: None,
            numerator_column: None,
            denominator_column: None,
            filters: None,
            unit: Some("currency".into()),
            currency: Some("€".into()),
            decimals: Some(2),
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["type"], "revenue");
        assert!(v.get("numerator_column").is_none());
        assert_eq!(v["currency"], "€");
    }

    #[test]
    fn test_results_tolerate_missing_optional_sections() {
        let r: AnalysisResults = serde_json::from_value(json!({
            "overall_results": {
                "total_users": 2000,
                "data_quality_score": 0.9,
                "correction_applied": "none",
                "significant_metrics": 0,
                "total_metrics": 1,
                "total_variations": 2
            },
            "metric_results": [{
                "metric_name": "Revenue",
                "metric_type": "revenue",
                "is_significant": false
            }]
        }))
        .unwrap();
        assert!(r.warnings.is_empty());
        assert!(r.metric("Revenue").is_some());
        assert!(r.metric("Other").is_none());
    }

    #[test]
    fn test_api_error_status() {
        let e = ApiError::Http {
            status: 404,
            message: "Job not found".into(),
        };
        assert_eq!(e.status(), Some(404));
        assert!(e.is_not_found());
        assert_eq!(e.to_string(), "API request failed: Job not found");
        assert_eq!(ApiError::Network("refused".into()).status(), None);
    }
}
