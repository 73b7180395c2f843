#![allow(dead_code)]

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use verdict::analysis::{AnalysisConfig, StatisticConfig, TestConfig};
use verdict::api::{
    AnalysisRequest, AnalysisResults, ApiError, DimensionFilters, FilterJob, JobState, JobStatus,
};
use verdict::service::{AnalysisBackend, PollingOptions};
use verdict::{AnalysisMetric, Dataset};

pub fn ecommerce_dataset() -> Dataset {
    Dataset::from_value(json!([
        {"Variation": "control", "Users": 1000, "User Add to Cart": 120, "User Purchases": 40,
         "Revenue": 2400.0, "Device Category": "mobile"},
        {"Variation": "variant_a", "Users": 1010, "User Add to Cart": 131, "User Purchases": 47,
         "Revenue": 2810.0, "Device Category": "desktop"}
    ]))
    .unwrap()
}

/// Per-metric results as the backend would return them, one per name.
pub fn results_for(names: &[&str]) -> AnalysisResults {
    let metric_results: Vec<serde_json::Value> = names
        .iter()
        .map(|name| {
            json!({
                "metric_name": name,
                "metric_type": "conversion",
                "variation_stats": [
                    {"variation": "control", "sample_size": 1000, "mean": 0.12, "std": 0.32},
                    {"variation": "variant_a", "sample_size": 1010, "mean": 0.13, "std": 0.34}
                ],
                "is_significant": false
            })
        })
        .collect();
    serde_json::from_value(json!({
        "overall_results": {
            "total_users": 2010,
            "variation_breakdown": [
                {"variation_name": "control", "user_count": 1000, "percentage": 49.75, "is_control": true},
                {"variation_name": "variant_a", "user_count": 1010, "percentage": 50.25, "is_control": false}
            ],
            "data_quality_score": 0.8,
            "correction_applied": "none",
            "significant_metrics": 0,
            "total_metrics": names.len(),
            "total_variations": 2
        },
        "metric_results": metric_results
    }))
    .unwrap()
}

pub fn config_with(metrics: Vec<AnalysisMetric>) -> AnalysisConfig {
    AnalysisConfig {
        data: ecommerce_dataset(),
        metrics,
        test_config: TestConfig {
            variation_column: "Variation".to_string(),
            user_column: Some("Users".to_string()),
            ..Default::default()
        },
        statistic_config: StatisticConfig::default(),
    }
}

pub fn fast_polling(max_attempts: u32) -> PollingOptions {
    PollingOptions {
        max_attempts,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        ..Default::default()
    }
}

/// Backend that reports "processing" a fixed number of times before
/// completing. `None` keeps it processing forever.
pub struct FakeBackend {
    processing_polls: Option<usize>,
    pub status_calls: AtomicUsize,
    pub submitted: Mutex<Vec<AnalysisRequest>>,
}

impl FakeBackend {
    pub fn completing_after(processing_polls: usize) -> Self {
        Self {
            processing_polls: Some(processing_polls),
            status_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn never_completing() -> Self {
        Self {
            processing_polls: None,
            status_calls: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn last_metric_names(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .last()
            .map(|r| r.metrics_config.iter().map(|m| m.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for FakeBackend {
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<String, ApiError> {
        self.submitted.lock().unwrap().push(request.clone());
        Ok("job-42".to_string())
    }

    async fn check_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        let seen = self.status_calls.fetch_add(1, Ordering::SeqCst);
        let status = match self.processing_polls {
            Some(n) if seen >= n => JobState::Completed,
            _ => JobState::Processing,
        };
        Ok(JobStatus {
            job_id: job_id.to_string(),
            status,
            created_at: "2026-01-01T00:00:00Z".to_string(),
            started_at: None,
            completed_at: None,
            failed_at: None,
            error: None,
            progress_percentage: None,
        })
    }

    async fn get_results(&self, _job_id: &str) -> Result<AnalysisResults, ApiError> {
        let names = self.last_metric_names();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        Ok(results_for(&names))
    }

    async fn analyze_with_filters(
        &self,
        job_id: &str,
        _filters: &DimensionFilters,
    ) -> Result<FilterJob, ApiError> {
        Ok(FilterJob {
            job_id: format!("{}-filtered", job_id),
            parent_job_id: job_id.to_string(),
        })
    }

    async fn cancel_job(&self, _job_id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}
