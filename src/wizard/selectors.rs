use super::{AnalysisState, AnalysisStep};
use crate::analysis::AnalysisConfig;

/// Whether `step` has what it needs, judged from `state` alone.
pub fn is_step_complete(state: &AnalysisState, step: AnalysisStep) -> bool {
    let data = &state.data;
    match step {
        AnalysisStep::SelectTest => state.ui.selected_test.is_some(),
        AnalysisStep::ImportData => !data.imported_data.is_empty(),
        AnalysisStep::SelectColumns => !data.selected_columns.is_empty(),
        AnalysisStep::ConfigureTest => {
            !data.test_config.variation_column.is_empty()
                && data
                    .test_config
                    .user_column
                    .as_deref()
                    .is_some_and(|c| !c.is_empty())
        }
        AnalysisStep::SelectMetrics => !data.selected_metrics.is_empty(),
        AnalysisStep::ConfigureStats => data.statistic_config.confidence_level > 0.0,
        AnalysisStep::RunAnalysis => state.ui.progress >= 100.0 && state.ui.error.is_none(),
        AnalysisStep::ViewResults => data.results.is_some(),
    }
}

/// Steps that are complete, in wizard order.
pub fn completed_steps(state: &AnalysisState) -> Vec<AnalysisStep> {
    AnalysisStep::ALL
        .into_iter()
        .filter(|step| is_step_complete(state, *step))
        .collect()
}

/// The run configuration assembled from the wizard's data.
pub fn analysis_config(state: &AnalysisState) -> AnalysisConfig {
    AnalysisConfig {
        data: state.data.imported_data.clone(),
        metrics: state.data.selected_metrics.clone(),
        test_config: state.data.test_config.clone(),
        statistic_config: state.data.statistic_config.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TestConfig;
    use crate::metrics::{AnalysisMetric, DetectedMetric};
    use crate::types::Dataset;
    use crate::wizard::{reduce, Action};
    use serde_json::json;

    #[test]
    fn test_nothing_complete_initially_except_stats() {
        let s = AnalysisState::default();
        assert_eq!(completed_steps(&s), vec![AnalysisStep::ConfigureStats]);
    }

    #[test]
    fn test_configure_test_needs_both_columns() {
        let mut s = AnalysisState::default();
        s.data.test_config = TestConfig {
            variation_column: "variant".into(),
            ..Default::default()
        };
        assert!(!is_step_complete(&s, AnalysisStep::ConfigureTest));
        s.data.test_config.user_column = Some("users".into());
        assert!(is_step_complete(&s, AnalysisStep::ConfigureTest));
    }

    #[test]
    fn test_select_metrics_needs_one_metric() {
        let s = reduce(
            &AnalysisState::default(),
            Action::SetSelectedMetrics(vec![AnalysisMetric::from_detected(DetectedMetric::count(
                "Items", "items", "d",
            ))]),
        );
        assert!(is_step_complete(&s, AnalysisStep::SelectMetrics));
    }

    #[test]
    fn test_run_analysis_needs_full_progress_and_no_error() {
        let mut s = AnalysisState::default();
        s.ui.progress = 100.0;
        assert!(is_step_complete(&s, AnalysisStep::RunAnalysis));
        s.ui.error = Some("Analysis failed".into());
        assert!(!is_step_complete(&s, AnalysisStep::RunAnalysis));
    }

    #[test]
    fn test_analysis_config_mirrors_state() {
        let data = Dataset::from_value(json!([{"variant": "A"}, {"variant": "B"}])).unwrap();
        let s = reduce(&AnalysisState::default(), Action::SetImportedData(data.clone()));
        let config = analysis_config(&s);
        assert_eq!(config.data, data);
        assert_eq!(config.statistic_config.confidence_level, 85.0);
        assert!(config.metrics.is_empty());
    }
}
