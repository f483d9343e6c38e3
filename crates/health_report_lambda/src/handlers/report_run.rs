use chrono::{DateTime, Utc};
use health_report_core::config::AnalysisConfig;
use health_report_core::contract::{
    AnalysisWindow, DeliveryResult, DestinationKind, RunStatus, RunSummary,
};
use health_report_core::error::RunError;
use health_report_core::report::{Report, ReportContext};
use health_report_core::run_context::run_fingerprint;
use health_report_core::storage_keys::render_filename;
use health_report_core::workbook::render_workbook;
use serde_json::json;
use thiserror::Error;

use crate::adapters::event_source::HealthEventSource;
use crate::adapters::mailer::Mailer;
use crate::adapters::metrics_sink::MetricsSink;
use crate::adapters::model::ModelClient;
use crate::adapters::object_store::ReportStore;
use crate::handlers::classify_events::classify_events;
use crate::handlers::distribute::{email_report, store_report, Artifact};
use crate::handlers::fetch_events::fetch_events;
use crate::handlers::logging::{log_error, log_info};
use crate::handlers::publish_metrics::publish_report_metrics;

const COMPONENT: &str = "run_handler";

pub struct ReportAdapters<'a> {
    pub events: &'a dyn HealthEventSource,
    pub model: &'a dyn ModelClient,
    pub store: &'a dyn ReportStore,
    pub mailer: &'a dyn Mailer,
    pub metrics: &'a dyn MetricsSink,
}

/// A fatal run error together with everything the run had recorded when it
/// stopped.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunHandlerError {
    #[source]
    pub error: RunError,
    pub summary: RunSummary,
}

impl RunHandlerError {
    /// The invocation error message: reason, cause and the run summary as JSON.
    pub fn invocation_message(&self) -> String {
        let summary = serde_json::to_string(&self.summary)
            .unwrap_or_else(|error| format!("\"unserializable summary: {error}\""));
        format!("{}: {} | summary={summary}", self.error.reason(), self.error)
    }
}

/// Runs one report over the window ending at `now`.
pub fn handle_report_run(
    config: &AnalysisConfig,
    now: DateTime<Utc>,
    adapters: &ReportAdapters<'_>,
) -> Result<RunSummary, RunHandlerError> {
    let window = AnalysisWindow::ending_at(now, config.window_days);
    let fingerprint = run_fingerprint(config, &window);
    log_info(
        COMPONENT,
        "run_started",
        json!({
            "run_fingerprint": fingerprint,
            "window_start": window.start,
            "window_end": window.end,
            "categories": config.category_filter_label(),
            "excluded_services": config.excluded_services,
        }),
    );

    let mut summary = RunSummary::new(RunStatus::Succeeded, fingerprint.clone());

    let fetched = match fetch_events(adapters.events, &window, config) {
        Ok(fetched) => fetched,
        Err(error) => return Err(fail(summary, RunError::UpstreamUnavailable(error))),
    };
    summary.filtered_events = fetched.stats.filtered_by_category;

    if fetched.events.is_empty() {
        summary.status = RunStatus::NoEvents;
        log_info(COMPONENT, "run_completed", json!({ "summary": summary }));
        return Ok(summary);
    }
    summary.events_processed = fetched.events.len();

    let classified = match classify_events(adapters.model, &fetched.events, &config.model) {
        Ok(rows) => rows,
        Err(error) => return Err(fail(summary, RunError::ModelUnavailable(error))),
    };

    let report = Report::build(
        ReportContext {
            customer_name: config.customer_name.clone(),
            window,
            category_filter: config.category_filter_label(),
            filtered_events: fetched.stats.filtered_by_category,
        },
        classified,
    );
    summary.tier_counts = report.counts();
    summary.parse_warnings = report.parse_warnings();

    let workbook = match render_workbook(&report) {
        Ok(bytes) => bytes,
        Err(error) => return Err(fail(summary, RunError::Report(error.to_string()))),
    };
    let filename = render_filename(&config.filename_template, now);
    summary.attachment_name = Some(filename.clone());

    publish_report_metrics(adapters.metrics, &config.metrics, &report);

    let artifact = Artifact {
        filename: &filename,
        bytes: &workbook,
        run_fingerprint: &fingerprint,
    };
    summary.deliveries = store_report(adapters.store, config, artifact);

    match email_report(adapters.mailer, config, &report, artifact) {
        Ok(delivery) => summary.deliveries.push(delivery),
        Err(error) => {
            summary.deliveries.push(DeliveryResult::failure(
                DestinationKind::Email,
                config.recipients.join(","),
                error.clone(),
            ));
            return Err(fail(summary, RunError::EmailDeliveryFailure(error)));
        }
    }

    summary.status = RunStatus::from_deliveries(&summary.deliveries);
    log_info(COMPONENT, "run_completed", json!({ "summary": summary }));
    Ok(summary)
}

fn fail(mut summary: RunSummary, error: RunError) -> RunHandlerError {
    summary.status = RunStatus::Failed;
    summary.failure_reason = Some(error.reason().to_string());
    log_error(
        COMPONENT,
        "run_failed",
        json!({
            "reason": error.reason(),
            "error": error.to_string(),
            "summary": summary,
        }),
    );
    RunHandlerError { error, summary }
}
