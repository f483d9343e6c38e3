mod aws;

use chrono::Utc;
use health_report_core::config::AnalysisConfig;
use health_report_core::error::RunError;
use health_report_lambda::handlers::logging::{log_error, log_info};
use health_report_lambda::handlers::report_run::{handle_report_run, ReportAdapters};
use health_report_lambda::handlers::trigger::{should_run, skipped_summary, trigger_source};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use crate::aws::{
    load_sdk_config, AwsHealthSource, BedrockModelClient, CloudWatchMetricsSink, S3ReportStore,
    SesMailer,
};

fn run_error(error: &RunError) -> Error {
    Error::from(format!("{}: {error}", error.reason()))
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = AnalysisConfig::from_env().map_err(|error| run_error(&RunError::from(error)))?;

    let source = trigger_source(&event.payload);
    if !should_run(&config, source) {
        let summary = skipped_summary();
        log_info(
            "run_handler",
            "run_skipped",
            json!({ "trigger": source, "reason": "SCHEDULE_ENABLED=false" }),
        );
        return Ok(serde_json::to_value(summary)?);
    }

    let sdk_config = load_sdk_config(&config.retry).await;
    let events = AwsHealthSource::connect(&sdk_config).await;
    let model = BedrockModelClient::new(&sdk_config);
    let store = S3ReportStore::new(&sdk_config);
    let mailer = SesMailer::new(&sdk_config);
    let metrics = CloudWatchMetricsSink::new(&sdk_config);
    let adapters = ReportAdapters {
        events: &events,
        model: &model,
        store: &store,
        mailer: &mailer,
        metrics: &metrics,
    };

    let summary = handle_report_run(&config, Utc::now(), &adapters).map_err(|failure| {
        log_error(
            "run_handler",
            "invocation_failed",
            json!({
                "reason": failure.error.reason(),
                "summary": failure.summary,
            }),
        );
        Error::from(failure.invocation_message())
    })?;
    Ok(serde_json::to_value(summary)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .init();

    lambda_runtime::run(service_fn(handle_request)).await
}
