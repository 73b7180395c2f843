use serde::{Deserialize, Serialize};

use crate::analysis::DataType;
use crate::types::Dataset;

const MAX_EMPTY_FRACTION: f64 = 0.5;

/// Id-like column names, most specific first.
const USER_COLUMN_PATTERNS: &[&str] = &[
    "user_id",
    "userid",
    "user",
    "visitor_id",
    "visitorid",
    "visitor",
    "customer_id",
    "customerid",
    "customer",
    "session_id",
    "sessionid",
    "session",
    "users",
];

/// Outcome of a local check. Errors block submission, warnings do not.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

pub(crate) fn sample_size_error(data_type: DataType) -> String {
    match data_type {
        DataType::Aggregated => {
            "Sample size too small for aggregated data (minimum 2 rows required - one per variation)"
                .to_string()
        }
        DataType::Raw => "Sample size too small for raw data (minimum 10 rows required)".to_string(),
    }
}

/// Structural checks on a table before it is shaped into a request.
///
/// Every violation is reported; an empty table short-circuits with a single
/// error.
pub fn validate_data(data: &Dataset, data_type: DataType) -> ValidationReport {
    let mut report = ValidationReport::default();
    let Some(first) = data.first_row() else {
        report.error("Data is empty");
        return report;
    };

    let expected = first.len();
    let inconsistent = data.rows().iter().filter(|r| r.len() != expected).count();
    if inconsistent > 0 {
        report.error(format!("{} rows have inconsistent column count", inconsistent));
    }

    if data.len() < data_type.minimum_rows() {
        report.error(sample_size_error(data_type));
    }

    let (cells, empty) = data.rows().iter().flat_map(|r| r.values()).fold(
        (0usize, 0usize),
        |(cells, empty), v| (cells + 1, empty + usize::from(v.is_missing())),
    );
    if cells > 0 {
        let fraction = empty as f64 / cells as f64;
        if fraction > MAX_EMPTY_FRACTION {
            report.error(format!("Too many empty values ({:.1}%)", fraction * 100.0));
        }
    }

    report
}

/// Lighter check used right after import: row minimums plus per-column
/// sparsity warnings.
pub fn preflight_dataset(data: &Dataset, data_type: DataType) -> ValidationReport {
    let mut report = ValidationReport::default();
    if data.is_empty() {
        report.error("No data provided for analysis");
        return report;
    }
    let columns = data.columns();
    if columns.is_empty() {
        report.error("Data has no columns");
        return report;
    }
    if data.len() < data_type.minimum_rows() {
        report.error(sample_size_error(data_type));
    }

    for column in &columns {
        let missing = data
            .rows()
            .iter()
            .filter(|r| r.get(column).map_or(true, |v| v.is_missing()))
            .count();
        let fraction = missing as f64 / data.len() as f64;
        if fraction > MAX_EMPTY_FRACTION {
            report.warn(format!(
                "Column '{}' has {:.1}% missing values",
                column,
                fraction * 100.0
            ));
        }
    }
    report
}

fn squash(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| !(c.is_whitespace() || *c == '-' || *c == '_'))
        .collect()
}

/// Finds the id-like column to count users by, trying patterns in order.
pub fn detect_user_column(data: &Dataset) -> Option<String> {
    let columns = data.columns();
    let squashed: Vec<String> = columns.iter().map(|c| squash(c)).collect();
    USER_COLUMN_PATTERNS.iter().find_map(|pattern| {
        let wanted = pattern.replace('_', "");
        squashed
            .iter()
            .position(|c| *c == wanted)
            .map(|i| columns[i].clone())
    })
}
