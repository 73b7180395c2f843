use crate::api::AnalysisResults;
use crate::metrics::AnalysisMetric;

/// Copies display metadata from the submitted metrics onto the backend's
/// per-metric results, matching on metric name.
///
/// Results whose name matches no submitted metric are returned unchanged.
pub fn enrich_results(mut results: AnalysisResults, metrics: &[AnalysisMetric]) -> AnalysisResults {
    for result in results.metric_results.iter_mut() {
        let Some(metric) = metrics.iter().find(|m| m.name == result.metric_name) else {
            tracing::warn!(
                metric = %result.metric_name,
                "result does not match any submitted metric, leaving display fields untouched"
            );
            continue;
        };

        result.metric_unit = Some(metric.unit.as_str().to_string());
        result.metric_currency = metric.currency.map(|c| c.to_string());
        result.metric_decimals = Some(metric.decimals);
        result.metric_is_revenue = Some(metric.is_revenue);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CurrencySymbol, DetectedMetric};
    use serde_json::json;

    fn results(names: &[&str]) -> AnalysisResults {
        let metric_results: Vec<serde_json::Value> = names
            .iter()
            .map(|n| json!({"metric_name": n, "metric_type": "revenue", "is_significant": true}))
            .collect();
        serde_json::from_value(json!({
            "overall_results": {
                "total_users": 10,
                "data_quality_score": 1.0,
                "correction_applied": "none",
                "significant_metrics": 1,
                "total_metrics": names.len(),
                "total_variations": 2
            },
            "metric_results": metric_results
        }))
        .unwrap()
    }

    #[test]
    fn test_matching_metric_is_enriched() {
        let metric = AnalysisMetric::from_detected(DetectedMetric::revenue(
            "Gross Revenue",
            "gross_revenue",
            CurrencySymbol::Pound,
            "Total gross revenue",
        ));
        let out = enrich_results(results(&["Gross Revenue"]), &[metric]);
        let r = &out.metric_results[0];
        assert_eq!(r.metric_unit.as_deref(), Some("currency"));
        assert_eq!(r.metric_currency.as_deref(), Some("£"));
        assert_eq!(r.metric_decimals, Some(2));
        assert_eq!(r.metric_is_revenue, Some(true));
    }

    #[test]
    fn test_unmatched_metric_passes_through() {
        let metric = AnalysisMetric::from_detected(DetectedMetric::count("Items", "items", "d"));
        let input = results(&["Something Else"]);
        let out = enrich_results(input.clone(), &[metric]);
        assert_eq!(out, input);
    }

    #[test]
    fn test_backend_currency_dropped_when_metric_has_none() {
        let metric = AnalysisMetric::from_detected(DetectedMetric::count("Items", "items", "d"));
        let mut input = results(&["Items"]);
        input.metric_results[0].metric_currency = Some("$".into());
        let out = enrich_results(input, &[metric]);
        assert_eq!(out.metric_results[0].metric_currency, None);
        assert_eq!(out.metric_results[0].metric_decimals, Some(0));
    }
}
