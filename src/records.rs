//! Experiment records pulled from the test-tracking base, and the subset that
//! is ready to be analysed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{CellValue, Dataset, Row};

pub const READY_FOR_ANALYSIS: &str = "Ready for Analysis";
const UNKNOWN: &str = "Unknown";

/// Anything that can hand back the experiment table as flat records.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self) -> Result<Dataset>;
}

/// An in-memory source, used by the CLI for exported tables and by tests.
pub struct StaticRecords(pub Dataset);

#[async_trait::async_trait]
impl RecordSource for StaticRecords {
    async fn fetch_records(&self) -> Result<Dataset> {
        Ok(self.0.clone())
    }
}

/// A test whose data collection is over and which can be picked in the
/// wizard's first step.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReadyTest {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub test_type: String,
    pub owner: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "mainKPI")]
    pub main_kpi: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hypothesis: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub audience: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mde: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub traffic_allocation: String,
}

impl ReadyTest {
    /// Days between start and end, inclusive, when both are known.
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_days() + 1),
            _ => None,
        }
    }
}

fn text(row: &Row, key: &str) -> String {
    row.get(key)
        .filter(|v| !v.is_missing())
        .map(CellValue::to_string)
        .unwrap_or_default()
}

fn text_or_unknown(row: &Row, keys: &[&str]) -> String {
    keys.iter()
        .map(|k| text(row, k))
        .find(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Accepts `2024-03-01` and full RFC 3339 timestamps.
fn date(row: &Row, key: &str) -> Option<NaiveDate> {
    let raw = text(row, key);
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    })
}

/// Maps one experiment record. Expects an `id` column next to the record's
/// fields.
pub fn ready_test_from_row(row: &Row) -> ReadyTest {
    ReadyTest {
        id: text(row, "id"),
        name: text_or_unknown(row, &["Name", "Title"]),
        test_type: text_or_unknown(row, &["Type"]),
        owner: text_or_unknown(row, &["Owner"]),
        start_date: date(row, "Start Date"),
        end_date: date(row, "End Date"),
        main_kpi: text_or_unknown(row, &["Main KPI"]),
        status: text_or_unknown(row, &["Status"]),
        description: text(row, "Description"),
        hypothesis: text(row, "Hypothesis"),
        success_criteria: ["Success Criteria #1", "Success Criteria #2", "Success Criteria #3"]
            .iter()
            .map(|k| text(row, k))
            .filter(|s| !s.is_empty())
            .collect(),
        audience: text(row, "Audience"),
        mde: text(row, "MDE"),
        traffic_allocation: text(row, "Traffic Allocation"),
    }
}

/// Keeps the records whose `Status` is "Ready for Analysis".
pub fn ready_tests_from_records(records: &Dataset) -> Vec<ReadyTest> {
    records
        .rows()
        .iter()
        .filter(|row| row.get("Status").and_then(CellValue::as_str) == Some(READY_FOR_ANALYSIS))
        .map(ready_test_from_row)
        .collect()
}

/// Fetches every record from `source` and keeps the ready ones.
pub async fn load_ready_tests(source: &dyn RecordSource) -> Result<Vec<ReadyTest>> {
    let records = source.fetch_records().await?;
    let tests = ready_tests_from_records(&records);
    tracing::info!(
        records = records.len(),
        ready = tests.len(),
        "loaded ready-for-analysis tests"
    );
    Ok(tests)
}
