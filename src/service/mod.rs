//! Runs one analysis end to end: local validation, request shaping,
//! submission, then polling until the backend job settles.

pub mod polling;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::analysis::{AnalysisConfig, DataType};
use crate::api::{AnalysisRequest, AnalysisResults, ApiError, DimensionFilters, FilterJob, JobStatus};
use crate::error::{AnalysisError, Result};
use crate::metrics::{AnalysisMetric, MetricKind};
use crate::transform::{prepare_config, PrepareOptions, ValidationReport};

pub use polling::PollingOptions;

const MIN_CONFIDENCE_LEVEL: f64 = 50.0;
const MAX_CONFIDENCE_LEVEL: f64 = 99.0;

/// Remote side of an analysis run. Implemented by
/// [`AnalysisApiClient`](crate::api::client::AnalysisApiClient); tests plug in
/// scripted fakes.
#[async_trait::async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn start_analysis(&self, request: &AnalysisRequest) -> std::result::Result<String, ApiError>;
    async fn check_status(&self, job_id: &str) -> std::result::Result<JobStatus, ApiError>;
    async fn get_results(&self, job_id: &str) -> std::result::Result<AnalysisResults, ApiError>;
    async fn analyze_with_filters(
        &self,
        job_id: &str,
        filters: &DimensionFilters,
    ) -> std::result::Result<FilterJob, ApiError>;
    async fn cancel_job(&self, job_id: &str) -> std::result::Result<(), ApiError>;
}

// ── Progress ──

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// 0–100.
    pub progress: f64,
    pub message: String,
    /// Time since polling began.
    pub elapsed: Duration,
}

impl ProgressUpdate {
    pub fn new(progress: f64, message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            progress,
            message: message.into(),
            elapsed,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Discards every update.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: ProgressUpdate) {}
}

// ── Config validation ──

/// Checks a run configuration before anything is sent.
///
/// Errors block the run; warnings are informational.
pub fn validate_config(config: &AnalysisConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    let test = &config.test_config;

    match config.data.first_row() {
        None => report.error("No data provided for analysis"),
        Some(first) => {
            if config.data.len() < test.data_type.minimum_rows() {
                report.error(match test.data_type {
                    DataType::Aggregated => {
                        "Aggregated data requires at least 2 rows (one per variation)"
                    }
                    DataType::Raw => "Raw data requires at least 10 rows for statistical significance",
                });
            }
            if !test.variation_column.is_empty() && !first.contains_key(&test.variation_column) {
                report.error(format!(
                    "Variation column '{}' not found in data",
                    test.variation_column
                ));
            }
            if let Some(user) = test.user_column.as_deref().filter(|c| !c.is_empty()) {
                if !first.contains_key(user) {
                    report.error(format!("User column '{}' not found in data", user));
                }
            }
        }
    }

    if config.metrics.is_empty() {
        report.error("No metrics selected for analysis");
    }
    for (i, metric) in config.metrics.iter().enumerate() {
        if metric.name.trim().is_empty() {
            report.error(format!("Metric {} is missing a name", i + 1));
        }
        match metric.kind {
            MetricKind::Binary => {
                if metric.numerator.is_none() {
                    report.error(format!(
                        "Binary metric '{}' is missing numerator column",
                        metric.name
                    ));
                }
                if metric.denominator.is_none() {
                    report.warn(format!(
                        "Binary metric '{}' is missing denominator column, will use user column",
                        metric.name
                    ));
                }
            }
            MetricKind::Continuous => {
                if metric.value_column.is_none() && metric.numerator.is_none() {
                    report.error(format!(
                        "Continuous metric '{}' is missing value column or numerator",
                        metric.name
                    ));
                }
            }
        }
    }

    if test.variation_column.is_empty() {
        report.error("Variation column is required");
    }

    let confidence = config.statistic_config.confidence_level;
    if !(MIN_CONFIDENCE_LEVEL..=MAX_CONFIDENCE_LEVEL).contains(&confidence) {
        report.warn("Confidence level should be between 50% and 99%");
    }

    report
}

// ── Service ──

struct ActiveRun {
    job_id: Option<String>,
    cancelled: Arc<AtomicBool>,
}

/// Clears the active-run slot when a run ends, however it ends.
struct RunGuard<'a> {
    slot: &'a Mutex<Option<ActiveRun>>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Orchestrates analysis runs against a backend. At most one run is active
/// per service; a second concurrent call fails with
/// [`AnalysisError::AlreadyRunning`].
pub struct AnalysisService<B> {
    backend: B,
    active: Mutex<Option<ActiveRun>>,
}

impl<B: AnalysisBackend> AnalysisService<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Job id of the run in flight, once it has been submitted.
    pub fn active_job(&self) -> Option<String> {
        self.lock_active().as_ref().and_then(|run| run.job_id.clone())
    }

    pub fn is_running(&self) -> bool {
        self.lock_active().is_some()
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_run(&self) -> Result<(RunGuard<'_>, Arc<AtomicBool>)> {
        let mut slot = self.lock_active();
        if slot.is_some() {
            return Err(AnalysisError::AlreadyRunning);
        }
        let cancelled = Arc::new(AtomicBool::new(false));
        *slot = Some(ActiveRun {
            job_id: None,
            cancelled: Arc::clone(&cancelled),
        });
        Ok((RunGuard { slot: &self.active }, cancelled))
    }

    fn record_job(&self, job_id: &str) {
        if let Some(run) = self.lock_active().as_mut() {
            run.job_id = Some(job_id.to_string());
        }
    }

    /// Validates, submits and polls one analysis, reporting progress along the
    /// way. Results come back enriched with each metric's display metadata.
    pub async fn run_analysis(
        &self,
        config: &AnalysisConfig,
        progress: &dyn ProgressSink,
        options: Option<PollingOptions>,
    ) -> Result<AnalysisResults> {
        let (_guard, cancelled) = self.begin_run()?;
        let options = options.unwrap_or_default();
        let started = tokio::time::Instant::now();

        let report = validate_config(config);
        for warning in &report.warnings {
            tracing::warn!(warning = %warning, "analysis configuration warning");
        }
        if !report.is_valid() {
            return Err(AnalysisError::Validation {
                errors: report.errors,
            });
        }

        progress.report(ProgressUpdate::new(10.0, "Preparing data...", started.elapsed()));
        let request = prepare_config(
            &config.data,
            &config.metrics,
            &config.test_config.variation_column,
            PrepareOptions {
                user_column: config.test_config.user_column.clone(),
                confidence_level: config.statistic_config.confidence_level,
                statistical_method: config.statistic_config.statistical_method,
                correction: config.statistic_config.multiple_testing_correction,
                data_type: config.test_config.data_type,
                filters: None,
            },
        )
        .map_err(|e| match e {
            AnalysisError::Validation { errors } => {
                AnalysisError::Transformation(format!("Data validation failed: {}", errors.join(", ")))
            }
            other => other,
        })?;

        progress.report(ProgressUpdate::new(20.0, "Starting analysis...", started.elapsed()));
        let job_id = self
            .backend
            .start_analysis(&request)
            .await
            .map_err(AnalysisError::Submission)?;
        self.record_job(&job_id);
        tracing::info!(
            job_id = %job_id,
            metrics = config.metrics.len(),
            rows = config.data.len(),
            "analysis submitted"
        );

        polling::poll_job(
            &self.backend,
            &job_id,
            &config.metrics,
            progress,
            &options,
            &cancelled,
            started,
        )
        .await
    }

    /// Re-runs a finished job restricted to `filters`, polling the derived job
    /// the same way as [`run_analysis`](Self::run_analysis).
    pub async fn rerun_with_filters(
        &self,
        parent_job_id: &str,
        filters: &DimensionFilters,
        metrics: &[AnalysisMetric],
        progress: &dyn ProgressSink,
        options: Option<PollingOptions>,
    ) -> Result<AnalysisResults> {
        if filters.values().all(|values| values.is_empty()) {
            return Err(AnalysisError::Validation {
                errors: vec!["At least one dimension filter is required".to_string()],
            });
        }
        let (_guard, cancelled) = self.begin_run()?;
        let options = options.unwrap_or_default();
        let started = tokio::time::Instant::now();

        let job = self
            .backend
            .analyze_with_filters(parent_job_id, filters)
            .await
            .map_err(AnalysisError::Submission)?;
        self.record_job(&job.job_id);
        tracing::info!(
            job_id = %job.job_id,
            parent_job_id = %job.parent_job_id,
            dimensions = filters.len(),
            "filtered analysis submitted"
        );

        polling::poll_job(
            &self.backend,
            &job.job_id,
            metrics,
            progress,
            &options,
            &cancelled,
            started,
        )
        .await
    }

    /// Asks the backend to stop `job_id` and stops local polling of it.
    ///
    /// Never fails: backend errors are logged and swallowed.
    pub async fn cancel_analysis(&self, job_id: &str) {
        let flagged = {
            let slot = self.lock_active();
            match slot.as_ref() {
                Some(run) if run.job_id.as_deref().map_or(true, |id| id == job_id) => {
                    run.cancelled.store(true, Ordering::SeqCst);
                    true
                }
                _ => false,
            }
        };
        tracing::info!(job_id, flagged, "cancelling analysis");

        if let Err(e) = self.backend.cancel_job(job_id).await {
            tracing::warn!(job_id, error = %e, "backend cancel request failed");
        }
    }
}

/// Human readable duration: `"1h 2m 3s"`, `"2m 3s"` or `"3s"`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
