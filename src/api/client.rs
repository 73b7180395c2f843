use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{
    AnalysisRequest, AnalysisResults, ApiError, DimensionFilters, FilterJob, FilterRequest,
    GetResultsResponse, HealthStatus, JobStatus, StartAnalysisResponse,
};
use crate::service::AnalysisBackend;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the analysis backend. No retries; callers decide.
#[derive(Debug, Clone)]
pub struct AnalysisApiClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl Default for AnalysisApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl AnalysisApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        // Every call carries a JSON content type, including bodiless GETs.
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Sends `request` and maps non-2xx responses to [`ApiError::Http`].
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let resp = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body_text = resp.text().await.unwrap_or_default();
        // FastAPI puts the reason under `detail`, either a string or a list of
        // validation errors.
        let detail = serde_json::from_str::<serde_json::Value>(&body_text)
            .ok()
            .and_then(|v| v.get("detail").cloned())
            .and_then(|d| match d {
                serde_json::Value::String(s) if !s.is_empty() => Some(s),
                serde_json::Value::Null => None,
                serde_json::Value::String(_) => None,
                other => Some(other.to_string()),
            });
        Err(ApiError::Http {
            status: status.as_u16(),
            message: detail.unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16())),
        })
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let resp = self.execute(request).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Submits a job and returns its id.
    pub async fn start_analysis(&self, request: &AnalysisRequest) -> Result<String, ApiError> {
        let started: StartAnalysisResponse = self
            .execute_json(self.http_client.post(self.url("/api/analyze")).json(request))
            .await?;
        tracing::info!(
            job_id = %started.job_id,
            metrics = request.metrics_config.len(),
            rows = request.data.len(),
            "analysis job submitted"
        );
        Ok(started.job_id)
    }

    pub async fn check_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        self.execute_json(
            self.http_client
                .get(self.url(&format!("/api/status/{}", job_id))),
        )
        .await
    }

    pub async fn get_results(&self, job_id: &str) -> Result<AnalysisResults, ApiError> {
        let response: GetResultsResponse = self
            .execute_json(
                self.http_client
                    .get(self.url(&format!("/api/results/{}", job_id))),
            )
            .await?;
        Ok(response.results)
    }

    /// Re-runs a finished job on a filtered slice of its data.
    pub async fn analyze_with_filters(
        &self,
        job_id: &str,
        filters: &DimensionFilters,
    ) -> Result<FilterJob, ApiError> {
        let body = FilterRequest {
            job_id: job_id.to_string(),
            filters: filters.clone(),
        };
        self.execute_json(
            self.http_client
                .post(self.url("/api/analyze/filter"))
                .json(&body),
        )
        .await
    }

    pub async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        self.execute_json(self.http_client.get(self.url("/health")))
            .await
    }

    /// Asks the backend to drop a job. Backends without a cancel route answer
    /// 404, which callers treat as best effort.
    pub async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        self.execute(
            self.http_client
                .post(self.url(&format!("/api/cancel/{}", job_id))),
        )
        .await
        .map(|_| ())
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for AnalysisApiClient {
    async fn start_analysis(&self, request: &AnalysisRequest) -> Result<String, ApiError> {
        AnalysisApiClient::start_analysis(self, request).await
    }

    async fn check_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        AnalysisApiClient::check_status(self, job_id).await
    }

    async fn get_results(&self, job_id: &str) -> Result<AnalysisResults, ApiError> {
        AnalysisApiClient::get_results(self, job_id).await
    }

    async fn analyze_with_filters(
        &self,
        job_id: &str,
        filters: &DimensionFilters,
    ) -> Result<FilterJob, ApiError> {
        AnalysisApiClient::analyze_with_filters(self, job_id, filters).await
    }

    async fn cancel_job(&self, job_id: &str) -> Result<(), ApiError> {
        AnalysisApiClient::cancel_job(self, job_id).await
    }
}
