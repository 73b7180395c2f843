mod common;

use serde_json::json;
use std::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{config_with, ecommerce_dataset, fast_polling, results_for, FakeBackend};
use verdict::api::AnalysisApiClient;
use verdict::metrics::{DetectedMetric, MetricKind};
use verdict::normalize::normalize_dataset;
use verdict::service::{validate_config, AnalysisService, NoProgress, ProgressUpdate};
use verdict::transform::{enrich_results, transform_metrics};
use verdict::{detect_metrics, AnalysisError, AnalysisMetric};

fn detected_metrics() -> Vec<AnalysisMetric> {
    detect_metrics(&normalize_dataset(&ecommerce_dataset()))
        .suggested_metrics
        .into_iter()
        .map(AnalysisMetric::from_detected)
        .collect()
}

// ── Polling ──

#[tokio::test(start_paused = true)]
async fn polling_resolves_after_processing_and_reports_100() {
    let service = AnalysisService::new(FakeBackend::completing_after(4));
    let updates = Mutex::new(Vec::<ProgressUpdate>::new());
    let sink = |u: ProgressUpdate| updates.lock().unwrap().push(u);

    let results = service
        .run_analysis(&config_with(detected_metrics()), &sink, Some(fast_polling(20)))
        .await
        .unwrap();

    assert_eq!(service.backend().status_calls(), 5);
    assert!(!results.metric_results.is_empty());
    let updates = updates.into_inner().unwrap();
    assert_eq!(updates.last().map(|u| u.progress), Some(100.0));
}

#[tokio::test(start_paused = true)]
async fn polling_times_out_after_exactly_max_attempts() {
    let service = AnalysisService::new(FakeBackend::never_completing());

    let err = service
        .run_analysis(&config_with(detected_metrics()), &NoProgress, Some(fast_polling(7)))
        .await
        .unwrap_err();

    assert_eq!(err, AnalysisError::Timeout { attempts: 7 });
    assert_eq!(service.backend().status_calls(), 7);
    assert!(err.to_string().contains("Maximum polling attempts reached"));
}

// ── Validation ──

#[test]
fn validation_collects_every_violation() {
    let unnamed = DetectedMetric::count("", "revenue", "");
    let mut no_numerator = DetectedMetric::new("Signup Rate", MetricKind::Binary, "");
    no_numerator.denominator = Some("Users".into());

    let report = validate_config(&config_with(vec![
        AnalysisMetric::from_detected(unnamed),
        AnalysisMetric::from_detected(no_numerator),
    ]));

    assert!(report.errors.len() >= 2, "{:?}", report.errors);
    assert!(report.errors.contains(&"Metric 1 is missing a name".to_string()));
    assert!(report
        .errors
        .contains(&"Binary metric 'Signup Rate' is missing numerator column".to_string()));
}

// ── Round trip ──

#[test]
fn enriched_results_keep_metric_names_and_display_metadata() {
    let metrics = detected_metrics();
    let configs = transform_metrics(&metrics);
    let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();

    let mut backend_results = results_for(&names);
    for result in backend_results.metric_results.iter_mut() {
        result.metric_currency = Some("$".to_string());
    }
    assert!(metrics.iter().any(|m| m.currency.is_none()));

    let enriched = enrich_results(backend_results, &metrics);

    assert_eq!(enriched.metric_results.len(), metrics.len());
    for result in &enriched.metric_results {
        let original = metrics
            .iter()
            .find(|m| m.name == result.metric_name)
            .expect("every result names a submitted metric");
        assert_eq!(result.metric_unit.as_deref(), Some(original.unit.as_str()));
        assert_eq!(
            result.metric_currency,
            original.currency.map(|c| c.to_string())
        );
        assert_eq!(result.metric_decimals, Some(original.decimals));
    }
}

#[tokio::test(start_paused = true)]
async fn service_submits_normalized_request() {
    let service = AnalysisService::new(FakeBackend::completing_after(0));
    service
        .run_analysis(&config_with(detected_metrics()), &NoProgress, Some(fast_polling(3)))
        .await
        .unwrap();

    let submitted = service.backend().submitted.lock().unwrap();
    let request = &submitted[0];
    assert_eq!(request.variation_column, "variation");
    assert_eq!(request.user_column.as_deref(), Some("users"));
    assert!(request.data.has_column("user_add_to_cart"));
}

// ── Over HTTP ──

#[tokio::test]
async fn full_run_against_http_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"job_id": "job-7"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-7",
            "status": "processing",
            "created_at": "2026-01-01T00:00:00Z"
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-7",
            "status": "completed",
            "created_at": "2026-01-01T00:00:00Z",
            "completed_at": "2026-01-01T00:00:03Z"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/results/job-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-7",
            "status": "completed",
            "results": results_for(&["Revenue"]),
            "completed_at": "2026-01-01T00:00:03Z"
        })))
        .mount(&server)
        .await;

    let revenue: Vec<AnalysisMetric> = detected_metrics()
        .into_iter()
        .filter(|m| m.name == "Revenue")
        .collect();
    let service = AnalysisService::new(AnalysisApiClient::new(server.uri()));

    let results = service
        .run_analysis(&config_with(revenue), &NoProgress, Some(fast_polling(10)))
        .await
        .unwrap();

    let metric = results.metric("Revenue").unwrap();
    assert_eq!(metric.metric_unit.as_deref(), Some("currency"));
    assert_eq!(metric.metric_currency.as_deref(), Some("€"));
    assert_eq!(metric.metric_is_revenue, Some(true));
}

#[tokio::test]
async fn backend_failure_detail_reaches_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analyze"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "variation column has one value"})),
        )
        .mount(&server)
        .await;

    let service = AnalysisService::new(AnalysisApiClient::new(server.uri()));
    let err = service
        .run_analysis(&config_with(detected_metrics()), &NoProgress, Some(fast_polling(3)))
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::Submission(_)));
    assert_eq!(
        err.to_string(),
        "Failed to start analysis: API request failed: variation column has one value"
    );
}
