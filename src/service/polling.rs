use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use super::{AnalysisBackend, ProgressSink, ProgressUpdate};
use crate::api::{AnalysisResults, JobState};
use crate::error::{AnalysisError, Result};
use crate::metrics::AnalysisMetric;
use crate::transform::enrich_results;

/// Default: ~10 minutes of polling, 1s growing by 1.2x up to 5s.
const DEFAULT_MAX_ATTEMPTS: u32 = 120;
const DEFAULT_INITIAL_DELAY_MS: u64 = 1000;
const DEFAULT_MAX_DELAY_MS: u64 = 5000;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.2;

const POLL_PROGRESS_START: f64 = 30.0;
const POLL_PROGRESS_SPAN: f64 = 60.0;
const POLL_PROGRESS_CAP: f64 = 90.0;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PollingOptions {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub initial_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Wall-clock ceiling on top of the attempt budget. Off by default.
    #[serde(with = "opt_millis")]
    pub max_elapsed: Option<Duration>,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_elapsed: None,
        }
    }
}

impl PollingOptions {
    /// Delay after `current`, capped at `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.backoff_multiplier.max(1.0);
        Duration::try_from_secs_f64(grown)
            .unwrap_or(self.max_delay)
            .max(current)
            .min(self.max_delay)
    }

    /// Progress shown before poll `attempt` (0-based): 30% rising linearly to
    /// at most 90%.
    pub fn progress_at(&self, attempt: u32) -> f64 {
        if self.max_attempts == 0 {
            return POLL_PROGRESS_START;
        }
        let fraction = attempt as f64 / self.max_attempts as f64;
        (POLL_PROGRESS_START + fraction * POLL_PROGRESS_SPAN).min(POLL_PROGRESS_CAP)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

/// Polls `job_id` until it reaches a terminal state, then fetches and
/// enriches its results.
///
/// `started` is when the run began; reported elapsed times and the
/// wall-clock ceiling count from it. `cancelled` is checked before every
/// attempt; an in-flight request is never interrupted.
pub(crate) async fn poll_job<B>(
    backend: &B,
    job_id: &str,
    metrics: &[AnalysisMetric],
    progress: &dyn ProgressSink,
    options: &PollingOptions,
    cancelled: &AtomicBool,
    started: Instant,
) -> Result<AnalysisResults>
where
    B: AnalysisBackend + ?Sized,
{
    let mut delay = options.initial_delay;

    for attempt in 0..options.max_attempts {
        if cancelled.load(Ordering::SeqCst) {
            tracing::info!(job_id, attempt, "polling stopped by cancellation");
            return Err(AnalysisError::Cancelled(job_id.to_string()));
        }
        if let Some(limit) = options.max_elapsed {
            if started.elapsed() >= limit {
                tracing::warn!(job_id, attempt, ?limit, "polling exceeded wall-clock limit");
                return Err(AnalysisError::Timeout { attempts: attempt });
            }
        }

        progress.report(ProgressUpdate::new(
            options.progress_at(attempt),
            "Processing analysis...",
            started.elapsed(),
        ));

        let last_attempt = attempt + 1 == options.max_attempts;
        let grow_delay = match backend.check_status(job_id).await {
            Ok(status) => match status.status {
                JobState::Completed => {
                    progress.report(ProgressUpdate::new(
                        95.0,
                        "Retrieving results...",
                        started.elapsed(),
                    ));
                    match backend.get_results(job_id).await {
                        Ok(results) => {
                            let results = enrich_results(results, metrics);
                            progress.report(ProgressUpdate::new(
                                100.0,
                                "Analysis completed!",
                                started.elapsed(),
                            ));
                            tracing::info!(
                                job_id,
                                attempts = attempt + 1,
                                metrics = results.metric_results.len(),
                                "analysis completed"
                            );
                            return Ok(results);
                        }
                        Err(e) if last_attempt => return Err(AnalysisError::PollingTransport(e)),
                        Err(e) => {
                            tracing::warn!(job_id, attempt, error = %e, "fetching results failed, retrying");
                            true
                        }
                    }
                }
                JobState::Failed => {
                    let message = status.error.unwrap_or_else(|| "Unknown error".to_string());
                    tracing::error!(job_id, error = %message, "analysis job failed");
                    return Err(AnalysisError::JobFailed(message));
                }
                JobState::Processing => {
                    tracing::debug!(job_id, attempt, ?delay, "job processing");
                    true
                }
                JobState::Queued | JobState::Unknown => {
                    tracing::debug!(job_id, attempt, state = ?status.status, "job not started");
                    false
                }
            },
            Err(e) if last_attempt => return Err(AnalysisError::PollingTransport(e)),
            Err(e) => {
                tracing::warn!(job_id, attempt, error = %e, "status check failed, retrying");
                true
            }
        };

        if last_attempt {
            break;
        }
        tokio::time::sleep(delay).await;
        if grow_delay {
            delay = options.next_delay(delay);
        }
    }

    tracing::warn!(job_id, attempts = options.max_attempts, "polling attempts exhausted");
    Err(AnalysisError::Timeout {
        attempts: options.max_attempts,
    })
}
