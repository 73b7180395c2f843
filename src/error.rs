use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Configuration validation failed: {}", errors.join(", "))]
    Validation { errors: Vec<String> },

    #[error("Data preparation failed: {0}")]
    Transformation(String),

    #[error("Failed to start analysis: {0}")]
    Submission(ApiError),

    #[error("Analysis polling failed: {0}")]
    PollingTransport(ApiError),

    #[error("Analysis failed: {0}")]
    JobFailed(String),

    #[error("Analysis timeout: Maximum polling attempts reached ({attempts})")]
    Timeout { attempts: u32 },

    #[error("Analysis cancelled: {0}")]
    Cancelled(String),

    #[error("An analysis is already running on this service")]
    AlreadyRunning,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl From<std::io::Error> for AnalysisError {
    fn from(e: std::io::Error) -> Self {
        AnalysisError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Json(e.to_string())
    }
}

impl AnalysisError {
    /// Errors raised before anything reached the backend.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AnalysisError::Validation { .. } | AnalysisError::Transformation(_)
        )
    }

    /// Only transport failures during polling are retried by the polling loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::PollingTransport(_))
    }

    /// Individual validation messages, empty for every other variant.
    pub fn validation_errors(&self) -> &[String] {
        match self {
            AnalysisError::Validation { errors } => errors,
            _ => &[],
        }
    }
}
