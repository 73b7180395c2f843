//! State of the eight-step analysis wizard and the actions that move it.
//!
//! The state is a plain value; [`reduce`] derives the next one without side
//! effects, so the host (UI, CLI, tests) owns when and where actions come from.

pub mod reducer;
pub mod selectors;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::{CorrectionMethod, DataType, StatisticConfig, StatisticalMethod, TestConfig};
use crate::api::AnalysisResults;
use crate::metrics::AnalysisMetric;
use crate::records::ReadyTest;
use crate::service::ProgressUpdate;
use crate::types::Dataset;

pub use reducer::reduce;
pub use selectors::{analysis_config, is_step_complete};

const INITIAL_CONFIDENCE_LEVEL: f64 = 85.0;
pub const READY_STATUS: &str = "Ready";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    /// Analyse a test already tracked in the base.
    #[default]
    Existing,
    /// Start from an uploaded file only.
    Scratch,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStep {
    #[default]
    SelectTest,
    ImportData,
    SelectColumns,
    ConfigureTest,
    SelectMetrics,
    ConfigureStats,
    RunAnalysis,
    ViewResults,
}

impl AnalysisStep {
    pub const ALL: [AnalysisStep; 8] = [
        AnalysisStep::SelectTest,
        AnalysisStep::ImportData,
        AnalysisStep::SelectColumns,
        AnalysisStep::ConfigureTest,
        AnalysisStep::SelectMetrics,
        AnalysisStep::ConfigureStats,
        AnalysisStep::RunAnalysis,
        AnalysisStep::ViewResults,
    ];

    /// 1-based position shown to users.
    pub fn number(&self) -> usize {
        *self as usize + 1
    }

    pub fn title(&self) -> &'static str {
        match self {
            AnalysisStep::SelectTest => "Select test",
            AnalysisStep::ImportData => "Import data",
            AnalysisStep::SelectColumns => "Select columns",
            AnalysisStep::ConfigureTest => "Configure test",
            AnalysisStep::SelectMetrics => "Select metrics",
            AnalysisStep::ConfigureStats => "Configure statistics",
            AnalysisStep::RunAnalysis => "Run analysis",
            AnalysisStep::ViewResults => "View results",
        }
    }
}

impl fmt::Display for AnalysisStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

/// Everything the user has entered so far.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WizardData {
    pub imported_data: Dataset,
    pub selected_columns: Vec<String>,
    pub selected_metrics: Vec<AnalysisMetric>,
    pub test_config: TestConfig,
    pub statistic_config: StatisticConfig,
    pub results: Option<AnalysisResults>,
}

impl Default for WizardData {
    fn default() -> Self {
        Self {
            imported_data: Dataset::default(),
            selected_columns: Vec::new(),
            selected_metrics: Vec::new(),
            test_config: TestConfig {
                variation_column: String::new(),
                user_column: None,
                data_type: DataType::Aggregated,
            },
            statistic_config: StatisticConfig {
                confidence_level: INITIAL_CONFIDENCE_LEVEL,
                statistical_method: StatisticalMethod::Frequentist,
                multiple_testing_correction: CorrectionMethod::Uncorrected,
            },
            results: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WizardUi {
    pub loading: bool,
    pub selected_test: Option<ReadyTest>,
    pub ready_tests: Vec<ReadyTest>,
    pub error: Option<String>,
    /// 0–100.
    pub progress: f64,
    pub status: String,
    pub elapsed_ms: u64,
}

impl Default for WizardUi {
    fn default() -> Self {
        Self {
            loading: false,
            selected_test: None,
            ready_tests: Vec::new(),
            error: None,
            progress: 0.0,
            status: READY_STATUS.to_string(),
            elapsed_ms: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    pub active_tab: ActiveTab,
    pub current_step: AnalysisStep,
    pub data: WizardData,
    pub ui: WizardUi,
}

/// One wizard event. Every variant is handled by [`reduce`].
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    SetActiveTab(ActiveTab),
    SetCurrentStep(AnalysisStep),
    SelectTest(ReadyTest),
    SetReadyTests(Vec<ReadyTest>),
    SetLoading(bool),
    SetError(Option<String>),
    SetImportedData(Dataset),
    SetSelectedColumns(Vec<String>),
    SetTestConfiguration(TestConfig),
    SetSelectedMetrics(Vec<AnalysisMetric>),
    SetStatisticConfig(StatisticConfig),
    StartAnalysis,
    UpdateProgress {
        progress: f64,
        status: String,
        elapsed_ms: u64,
    },
    AnalysisSuccess(Box<AnalysisResults>),
    AnalysisError(String),
    Reset,
}

impl From<ProgressUpdate> for Action {
    fn from(update: ProgressUpdate) -> Self {
        Action::UpdateProgress {
            progress: update.progress,
            status: update.message,
            elapsed_ms: update.elapsed.as_millis() as u64,
        }
    }
}
