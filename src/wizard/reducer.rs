use super::{Action, AnalysisState, AnalysisStep};

/// Returns the state that follows `state` after `action`.
///
/// Data-entry actions store their payload, clear any stored error and move to
/// the step after the one they complete. Progress updates never move the step.
pub fn reduce(state: &AnalysisState, action: Action) -> AnalysisState {
    let mut next = state.clone();
    match action {
        Action::SetActiveTab(tab) => next.active_tab = tab,
        Action::SetCurrentStep(step) => next.current_step = step,
        Action::SelectTest(test) => {
            next.ui.selected_test = Some(test);
            next.ui.error = None;
            next.current_step = AnalysisStep::ImportData;
        }
        Action::SetReadyTests(tests) => {
            next.ui.ready_tests = tests;
            next.ui.loading = false;
        }
        Action::SetLoading(loading) => next.ui.loading = loading,
        Action::SetError(error) => {
            next.ui.error = error;
            next.ui.loading = false;
        }
        Action::SetImportedData(data) => {
            next.data.imported_data = data;
            next.ui.error = None;
            next.current_step = AnalysisStep::SelectColumns;
        }
        Action::SetSelectedColumns(columns) => {
            next.data.selected_columns = columns;
            next.ui.error = None;
            next.current_step = AnalysisStep::ConfigureTest;
        }
        Action::SetTestConfiguration(config) => {
            next.data.test_config = config;
            next.ui.error = None;
            next.current_step = AnalysisStep::SelectMetrics;
        }
        Action::SetSelectedMetrics(metrics) => {
            next.data.selected_metrics = metrics;
            next.ui.error = None;
            next.current_step = AnalysisStep::ConfigureStats;
        }
        Action::SetStatisticConfig(config) => {
            next.data.statistic_config = config;
            next.ui.error = None;
        }
        Action::StartAnalysis => {
            next.current_step = AnalysisStep::RunAnalysis;
            next.ui.loading = true;
            next.ui.error = None;
            next.ui.progress = 0.0;
            next.ui.status = "Initializing analysis...".to_string();
            next.ui.elapsed_ms = 0;
        }
        Action::UpdateProgress {
            progress,
            status,
            elapsed_ms,
        } => {
            next.ui.progress = progress.clamp(0.0, 100.0);
            next.ui.status = status;
            next.ui.elapsed_ms = elapsed_ms;
        }
        Action::AnalysisSuccess(results) => {
            next.current_step = AnalysisStep::ViewResults;
            next.data.results = Some(*results);
            next.ui.loading = false;
            next.ui.error = None;
            next.ui.progress = 100.0;
            next.ui.status = "Analysis completed successfully".to_string();
        }
        Action::AnalysisError(message) => {
            next.ui.loading = false;
            next.ui.error = Some(message);
            next.ui.progress = 0.0;
            next.ui.status = "Analysis failed".to_string();
        }
        Action::Reset => {
            let mut reset = AnalysisState::default();
            reset.ui.ready_tests = std::mem::take(&mut next.ui.ready_tests);
            reset.ui.selected_test = next.ui.selected_test.take();
            next = reset;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DataType, TestConfig};
    use crate::records::ReadyTest;
    use crate::service::ProgressUpdate;
    use crate::types::Dataset;
    use crate::wizard::ActiveTab;
    use serde_json::json;
    use std::time::Duration;

    fn ready_test(id: &str) -> ReadyTest {
        ReadyTest {
            id: id.to_string(),
            name: format!("Test {id}"),
            status: "Ready for Analysis".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_defaults() {
        let s = AnalysisState::default();
        assert_eq!(s.active_tab, ActiveTab::Existing);
        assert_eq!(s.current_step, AnalysisStep::SelectTest);
        assert_eq!(s.data.statistic_config.confidence_level, 85.0);
        assert_eq!(s.data.test_config.data_type, DataType::Aggregated);
        assert_eq!(s.ui.status, "Ready");
        assert!(!s.ui.loading);
        assert!(s.ui.error.is_none());
    }

    #[test]
    fn test_each_data_action_advances_one_step() {
        let s = AnalysisState::default();
        let s = reduce(&s, Action::SelectTest(ready_test("rec1")));
        assert_eq!(s.current_step, AnalysisStep::ImportData);
        let data = Dataset::from_value(json!([{"variant": "A"}, {"variant": "B"}])).unwrap();
        let s = reduce(&s, Action::SetImportedData(data));
        assert_eq!(s.current_step, AnalysisStep::SelectColumns);
        let s = reduce(&s, Action::SetSelectedColumns(vec!["variant".into()]));
        assert_eq!(s.current_step, AnalysisStep::ConfigureTest);
        let s = reduce(
            &s,
            Action::SetTestConfiguration(TestConfig {
                variation_column: "variant".into(),
                ..Default::default()
            }),
        );
        assert_eq!(s.current_step, AnalysisStep::SelectMetrics);
        let s = reduce(&s, Action::SetSelectedMetrics(vec![]));
        assert_eq!(s.current_step, AnalysisStep::ConfigureStats);
        let s = reduce(&s, Action::StartAnalysis);
        assert_eq!(s.current_step, AnalysisStep::RunAnalysis);
        assert!(s.ui.loading);
        assert_eq!(s.ui.status, "Initializing analysis...");
    }

    #[test]
    fn test_statistic_config_does_not_move_step() {
        let s = reduce(&AnalysisState::default(), Action::SetCurrentStep(AnalysisStep::ConfigureStats));
        let mut config = s.data.statistic_config.clone();
        config.confidence_level = 95.0;
        let s = reduce(&s, Action::SetStatisticConfig(config));
        assert_eq!(s.current_step, AnalysisStep::ConfigureStats);
        assert_eq!(s.data.statistic_config.confidence_level, 95.0);
    }

    #[test]
    fn test_progress_updates_keep_step() {
        let s = reduce(&AnalysisState::default(), Action::StartAnalysis);
        let update = ProgressUpdate::new(42.0, "Processing analysis...", Duration::from_millis(1500));
        let s = reduce(&s, update.into());
        assert_eq!(s.current_step, AnalysisStep::RunAnalysis);
        assert_eq!(s.ui.progress, 42.0);
        assert_eq!(s.ui.status, "Processing analysis...");
        assert_eq!(s.ui.elapsed_ms, 1500);
    }

    #[test]
    fn test_analysis_error_resets_progress() {
        let s = reduce(&AnalysisState::default(), Action::StartAnalysis);
        let s = reduce(
            &s,
            Action::UpdateProgress {
                progress: 60.0,
                status: "Processing analysis...".into(),
                elapsed_ms: 10,
            },
        );
        let s = reduce(&s, Action::AnalysisError("Analysis failed: boom".into()));
        assert_eq!(s.ui.error.as_deref(), Some("Analysis failed: boom"));
        assert_eq!(s.ui.progress, 0.0);
        assert_eq!(s.ui.status, "Analysis failed");
        assert!(!s.ui.loading);
        assert_eq!(s.current_step, AnalysisStep::RunAnalysis);
    }

    #[test]
    fn test_next_data_action_clears_error() {
        let s = reduce(&AnalysisState::default(), Action::SetError(Some("bad file".into())));
        assert_eq!(s.ui.error.as_deref(), Some("bad file"));
        let s = reduce(&s, Action::SetImportedData(Dataset::default()));
        assert!(s.ui.error.is_none());
    }

    #[test]
    fn test_ready_tests_stop_loading() {
        let s = reduce(&AnalysisState::default(), Action::SetLoading(true));
        let s = reduce(&s, Action::SetReadyTests(vec![ready_test("rec1")]));
        assert!(!s.ui.loading);
        assert_eq!(s.ui.ready_tests.len(), 1);
    }

    #[test]
    fn test_input_state_is_untouched() {
        let before = AnalysisState::default();
        let _ = reduce(&before, Action::StartAnalysis);
        assert_eq!(before, AnalysisState::default());
    }
}
