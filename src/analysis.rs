use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::metrics::AnalysisMetric;
use crate::types::Dataset;

/// Shape of the imported table.
///
/// Aggregated data has one row per variation, raw data one row per user or
/// event.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Aggregated,
    Raw,
}

impl DataType {
    /// Fewest rows the backend can analyse for this shape.
    pub fn minimum_rows(&self) -> usize {
        match self {
            DataType::Aggregated => 2,
            DataType::Raw => 10,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatisticalMethod {
    #[default]
    Frequentist,
    Bayesian,
    Bootstrap,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionMethod {
    #[default]
    #[serde(rename = "none")]
    Uncorrected,
    Bonferroni,
    Fdr,
}

macro_rules! impl_lowercase_str {
    ($ty:ty { $($variant:path => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($ty), other)),
                }
            }
        }
    };
}

impl_lowercase_str!(DataType {
    DataType::Aggregated => "aggregated",
    DataType::Raw => "raw",
});

impl_lowercase_str!(StatisticalMethod {
    StatisticalMethod::Frequentist => "frequentist",
    StatisticalMethod::Bayesian => "bayesian",
    StatisticalMethod::Bootstrap => "bootstrap",
});

impl_lowercase_str!(CorrectionMethod {
    CorrectionMethod::Uncorrected => "none",
    CorrectionMethod::Bonferroni => "bonferroni",
    CorrectionMethod::Fdr => "fdr",
});

/// Which columns identify the arm and the unit of a test.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    pub variation_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_column: Option<String>,
    #[serde(default)]
    pub data_type: DataType,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatisticConfig {
    /// Percentage, 50–99.
    pub confidence_level: f64,
    pub statistical_method: StatisticalMethod,
    pub multiple_testing_correction: CorrectionMethod,
}

impl Default for StatisticConfig {
    fn default() -> Self {
        Self {
            confidence_level: 95.0,
            statistical_method: StatisticalMethod::Frequentist,
            multiple_testing_correction: CorrectionMethod::Uncorrected,
        }
    }
}

/// Everything one analysis run needs. Not modified once a run starts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    pub data: Dataset,
    pub metrics: Vec<AnalysisMetric>,
    pub test_config: TestConfig,
    pub statistic_config: StatisticConfig,
}
