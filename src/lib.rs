pub mod analysis;
pub mod api;
pub mod config;
pub mod detection;
pub mod error;
pub mod estimator;
pub mod metrics;
pub mod normalize;
pub mod records;
pub mod service;
pub mod transform;
pub mod types;
pub mod wizard;

pub use analysis::{AnalysisConfig, StatisticConfig, TestConfig};
pub use api::{AnalysisApiClient, AnalysisResults, ApiError};
pub use config::ClientConfig;
pub use detection::{detect_metrics, enhance_metric_detection, DetectionResult};
pub use error::{AnalysisError, Result};
pub use metrics::{AnalysisMetric, DetectedMetric};
pub use normalize::normalize_column_name;
pub use service::{AnalysisBackend, AnalysisService, PollingOptions, ProgressUpdate};
pub use transform::prepare_config;
pub use types::{CellValue, Dataset, Row};
