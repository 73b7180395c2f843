use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verdict::analysis::{CorrectionMethod, DataType, StatisticConfig, StatisticalMethod, TestConfig};
use verdict::detection::{detect_metrics, enhance_metric_detection, profile_columns, DetectionResult};
use verdict::estimator::{estimate_test_duration, DurationParams};
use verdict::records::{load_ready_tests, StaticRecords};
use verdict::service::{format_duration, validate_config, AnalysisService, ProgressUpdate};
use verdict::transform::{preflight_dataset, prepare_config, PrepareOptions};
use verdict::wizard::{analysis_config, reduce, Action, AnalysisState};
use verdict::{AnalysisMetric, ClientConfig, Dataset};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "verdict", version, about = "Detect metrics in A/B test exports and run their analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding an optional verdict.json
    #[arg(long, env = "VERDICT_CONFIG_DIR", default_value = ".", global = true)]
    config_dir: PathBuf,
    /// Analysis API base URL (overrides verdict.json)
    #[arg(long, env = "VERDICT_API_URL", global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the metrics, dimensions and data quality detected in a JSON export
    Detect {
        file: PathBuf,
        /// Also match the built-in metric templates
        #[arg(long)]
        enhance: bool,
        /// Include a per-column profile
        #[arg(long)]
        profile: bool,
    },
    /// Check that an export is usable before configuring an analysis
    Preflight {
        file: PathBuf,
        #[arg(long, default_value = "aggregated")]
        data_type: DataType,
    },
    /// Print the backend request that `run` would submit
    Prepare(AnalysisArgs),
    /// Submit an analysis and wait for its results
    Run {
        #[command(flatten)]
        analysis: AnalysisArgs,
        /// Maximum number of status checks
        #[arg(long)]
        max_attempts: Option<u32>,
    },
    /// Check that the analysis API is up
    Health,
    /// Estimate how many days a conversion test needs
    Estimate {
        #[arg(long)]
        audience_per_day: f64,
        #[arg(long)]
        conversions_per_day: f64,
        /// Relative minimum detectable effect, e.g. 0.05 for +5%
        #[arg(long)]
        mde: f64,
        #[arg(long, default_value_t = 1.0)]
        traffic_exposed: f64,
        #[arg(long, default_value_t = 0.05)]
        alpha: f64,
        #[arg(long, default_value_t = 0.8)]
        power: f64,
    },
    /// List the tests marked "Ready for Analysis" in an exported records file
    ReadyTests { file: PathBuf },
}

#[derive(Args)]
struct AnalysisArgs {
    file: PathBuf,
    /// Defaults to the detected variation column
    #[arg(long)]
    variation_column: Option<String>,
    /// Defaults to the detected user column
    #[arg(long)]
    user_column: Option<String>,
    #[arg(long, default_value = "aggregated")]
    data_type: DataType,
    #[arg(long, default_value_t = 95.0)]
    confidence: f64,
    #[arg(long, default_value = "frequentist")]
    method: StatisticalMethod,
    #[arg(long, default_value = "none")]
    correction: CorrectionMethod,
    /// Metric to analyse, by detected name; repeatable. Defaults to all detected metrics
    #[arg(long = "metric")]
    metrics: Vec<String>,
    /// Match the built-in metric templates as well
    #[arg(long)]
    enhance: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn detect(data: &Dataset, enhance: bool) -> DetectionResult {
    let result = detect_metrics(data);
    if enhance {
        enhance_metric_detection(data, result)
    } else {
        result
    }
}

fn select_metrics(detection: &DetectionResult, names: &[String]) -> Result<Vec<AnalysisMetric>, String> {
    if names.is_empty() {
        return Ok(detection
            .suggested_metrics
            .iter()
            .cloned()
            .map(AnalysisMetric::from_detected)
            .collect());
    }
    names
        .iter()
        .map(|name| {
            detection
                .metric(name)
                .cloned()
                .map(AnalysisMetric::from_detected)
                .ok_or_else(|| {
                    let known: Vec<&str> =
                        detection.suggested_metrics.iter().map(|m| m.name.as_str()).collect();
                    format!("Unknown metric '{}' (detected: {})", name, known.join(", "))
                })
        })
        .collect()
}

/// Walks the wizard from import to statistics configuration, the same
/// sequence a user goes through interactively.
fn configure(args: &AnalysisArgs) -> Result<AnalysisState, Box<dyn std::error::Error>> {
    let data = Dataset::load(&args.file)?;
    let detection = detect(&data, args.enhance);

    let variation_column = args
        .variation_column
        .clone()
        .or_else(|| detection.variation_column.clone())
        .ok_or("No variation column given and none detected")?;
    let metrics = select_metrics(&detection, &args.metrics)?;

    let actions = vec![
        Action::SetImportedData(data.clone()),
        Action::SetSelectedColumns(data.columns()),
        Action::SetTestConfiguration(TestConfig {
            variation_column,
            user_column: args
                .user_column
                .clone()
                .or_else(|| detection.user_column.clone()),
            data_type: args.data_type,
        }),
        Action::SetSelectedMetrics(metrics),
        Action::SetStatisticConfig(StatisticConfig {
            confidence_level: args.confidence,
            statistical_method: args.method,
            multiple_testing_correction: args.correction,
        }),
    ];
    Ok(actions
        .into_iter()
        .fold(AnalysisState::default(), |state, action| reduce(&state, action)))
}

fn run_prepare(args: &AnalysisArgs) -> CliResult {
    let config = analysis_config(&configure(args)?);
    let report = validate_config(&config);
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    if !report.is_valid() {
        return Err(verdict::AnalysisError::Validation {
            errors: report.errors,
        }
        .into());
    }
    let request = prepare_config(
        &config.data,
        &config.metrics,
        &config.test_config.variation_column,
        PrepareOptions {
            user_column: config.test_config.user_column.clone(),
            confidence_level: config.statistic_config.confidence_level,
            statistical_method: config.statistic_config.statistical_method,
            correction: config.statistic_config.multiple_testing_correction,
            data_type: config.test_config.data_type,
            filters: None,
        },
    )?;
    print_json(&request)
}

async fn run_analysis(args: &AnalysisArgs, client_config: &ClientConfig) -> CliResult {
    let state = Mutex::new(reduce(&configure(args)?, Action::StartAnalysis));
    let config = analysis_config(&state.lock().unwrap_or_else(|e| e.into_inner()));

    let service = AnalysisService::new(client_config.client());
    let sink = |update: ProgressUpdate| {
        tracing::info!(
            progress = update.progress,
            elapsed = %format_duration(update.elapsed),
            "{}",
            update.message
        );
        let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
        *state = reduce(&state, update.into());
    };

    let outcome = service
        .run_analysis(&config, &sink, Some(client_config.polling.clone()))
        .await;

    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    match outcome {
        Ok(results) => {
            *state = reduce(&state, Action::AnalysisSuccess(Box::new(results)));
            tracing::info!(status = %state.ui.status, "{}", state.current_step);
            print_json(&state.data.results)
        }
        Err(e) => {
            *state = reduce(&state, Action::AnalysisError(e.to_string()));
            tracing::error!(status = %state.ui.status, "{}", e);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();
    init_tracing();

    let load_client_config = || {
        let mut config = ClientConfig::load_or_default(&cli.config_dir);
        if let Some(url) = &cli.api_url {
            config.api_url = url.clone();
        }
        config
    };

    match &cli.command {
        Command::Detect {
            file,
            enhance,
            profile,
        } => {
            let data = Dataset::load(file)?;
            let result = detect(&data, *enhance);
            if *profile {
                print_json(&serde_json::json!({
                    "detection": result,
                    "columns": profile_columns(&data),
                }))
            } else {
                print_json(&result)
            }
        }
        Command::Preflight { file, data_type } => {
            let report = preflight_dataset(&Dataset::load(file)?, *data_type);
            print_json(&report)?;
            if report.is_valid() {
                Ok(())
            } else {
                Err(report.errors.join(", ").into())
            }
        }
        Command::Prepare(args) => run_prepare(args),
        Command::Run {
            analysis,
            max_attempts,
        } => {
            let mut config = load_client_config();
            if let Some(attempts) = max_attempts {
                config.polling.max_attempts = *attempts;
            }
            run_analysis(analysis, &config).await
        }
        Command::Health => {
            let client = load_client_config().client();
            let status = client.health_check().await?;
            print_json(&status)?;
            if status.is_healthy() {
                Ok(())
            } else {
                Err(format!("Analysis API at {} is {}", client.base_url(), status.status).into())
            }
        }
        Command::Estimate {
            audience_per_day,
            conversions_per_day,
            mde,
            traffic_exposed,
            alpha,
            power,
        } => {
            let estimate = estimate_test_duration(&DurationParams {
                audience_per_day: *audience_per_day,
                conversions_per_day: *conversions_per_day,
                mde: *mde,
                traffic_exposed: *traffic_exposed,
                alpha: *alpha,
                power: *power,
            })?;
            print_json(&estimate)
        }
        Command::ReadyTests { file } => {
            let source = StaticRecords(Dataset::load(file)?);
            let tests = load_ready_tests(&source).await?;
            print_json(&tests)
        }
    }
}
