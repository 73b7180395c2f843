use serde::{Deserialize, Serialize};

use crate::types::Dataset;

const SMALL_SAMPLE_ROWS: usize = 100;
const SMALL_SAMPLE_PENALTY: f64 = 0.2;
const NUMERIC_SAMPLE_ROWS: usize = 100;
const NUMERIC_THRESHOLD: f64 = 0.8;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct DataQuality {
    /// 0.0 (unusable) to 1.0 (clean).
    pub score: f64,
    pub warnings: Vec<String>,
}

/// Scores a dataset for completeness and size.
///
/// Missing cells are counted against the first row's columns, so a key absent
/// from a later row counts as missing. Rows with a different key count only
/// produce a warning.
pub fn calculate_data_quality(data: &Dataset) -> DataQuality {
    let columns = data.columns();
    if data.is_empty() || columns.is_empty() {
        return DataQuality {
            score: 0.0,
            warnings: vec!["No data provided".to_string()],
        };
    }

    let mut warnings = Vec::new();
    let mut score = 1.0;

    let total_cells = columns.len() * data.len();
    let missing_cells: usize = data
        .rows()
        .iter()
        .map(|row| {
            columns
                .iter()
                .filter(|c| row.get(c.as_str()).map_or(true, |v| v.is_missing()))
                .count()
        })
        .sum();

    if missing_cells > 0 {
        let missing_fraction = missing_cells as f64 / total_cells as f64;
        warnings.push(format!(
            "{:.1}% of data is missing",
            missing_fraction * 100.0
        ));
        score -= missing_fraction;
    }

    if data.len() < SMALL_SAMPLE_ROWS {
        warnings.push("Small sample size may affect statistical significance".to_string());
        score -= SMALL_SAMPLE_PENALTY;
    }

    let inconsistent = data
        .rows()
        .iter()
        .filter(|row| row.len() != columns.len())
        .count();
    if inconsistent > 0 {
        warnings.push(format!("{} rows have inconsistent columns", inconsistent));
    }

    DataQuality {
        score: f64::clamp(score, 0.0, 1.0),
        warnings,
    }
}

/// True when at least 80% of the non-empty values among the first 100 rows
/// parse as finite numbers.
pub fn is_numeric_column(data: &Dataset, column: &str) -> bool {
    let mut present = 0usize;
    let mut numeric = 0usize;
    for cell in data
        .rows()
        .iter()
        .take(NUMERIC_SAMPLE_ROWS)
        .filter_map(|row| row.get(column))
        .filter(|cell| !cell.is_missing())
    {
        present += 1;
        if cell.as_f64().is_some() {
            numeric += 1;
        }
    }
    present > 0 && numeric as f64 / present as f64 >= NUMERIC_THRESHOLD
}
