mod support;

use health_report_core::contract::{DestinationKind, RunStatus, TierCounts};
use health_report_core::workbook::XLSX_CONTENT_TYPE;
use health_report_lambda::handlers::report_run::handle_report_run;
use health_report_lambda::handlers::trigger::{should_run, trigger_source, TriggerSource};
use serde_json::json;
use support::fakes::{
    CapturingMailer, FakeHealthSource, Harness, PromptAwareModel, RecordingMetrics,
    RecordingStore,
};
use support::{config, config_with, health_event, invocation_time};

const RISK_BY_TYPE: [(&str, &str); 3] = [
    ("AWS_EC2_INSTANCE_RETIREMENT_SCHEDULED", "critical"),
    ("AWS_RDS_CERTIFICATE_ROTATION", "critical"),
    ("AWS_LAMBDA_RUNTIME_DEPRECATION", "low"),
];

fn five_event_source() -> FakeHealthSource {
    FakeHealthSource {
        settled: vec![
            health_event("arn:ec2-1", "AWS_EC2_INSTANCE_RETIREMENT_SCHEDULED", 10),
            health_event("arn:ec2-2", "AWS_EC2_INSTANCE_RETIREMENT_SCHEDULED", 20),
            health_event("arn:lambda-1", "AWS_LAMBDA_RUNTIME_DEPRECATION", 30),
        ],
        open: vec![
            health_event("arn:rds-1", "AWS_RDS_CERTIFICATE_ROTATION", 40),
            health_event("arn:lambda-2", "AWS_LAMBDA_RUNTIME_DEPRECATION", 50),
        ],
        listing_error: None,
    }
}

#[test]
fn weekly_run_reports_tiers_and_delivers_everywhere() {
    let harness = Harness::new(five_event_source(), PromptAwareModel::new(&RISK_BY_TYPE));
    let config = config();

    let summary =
        handle_report_run(&config, invocation_time(), &harness.adapters()).expect("run succeeds");

    assert_eq!(config.window_days, 8);
    assert_eq!(summary.status, RunStatus::Succeeded);
    assert_eq!(summary.events_processed, 5);
    assert_eq!(
        summary.tier_counts,
        TierCounts {
            critical: 3,
            high: 0,
            medium: 0,
            low: 2,
        }
    );
    assert_eq!(summary.tier_counts.total(), summary.events_processed);
    assert_eq!(summary.parse_warnings, 0);
    assert_eq!(summary.attachment_name.as_deref(), Some("health_2025-10-09.xlsx"));
    assert_eq!(harness.model.calls(), 1);

    let writes = harness.store.writes();
    let uris: Vec<String> = writes.iter().map(|(target, _)| target.uri()).collect();
    assert_eq!(
        uris,
        vec![
            "s3://internal-reports/reports/health_2025-10-09.xlsx",
            "s3://customer-share/health/weekly/health_2025-10-09.xlsx",
        ]
    );
    for (target, body) in &writes {
        assert_eq!(target.content_type, XLSX_CONTENT_TYPE);
        assert_eq!(target.run_fingerprint, summary.run_fingerprint);
        assert!(body.starts_with(b"PK"), "workbook is a zip container");
    }
    assert_eq!(writes[0].1, writes[1].1);

    let sent = harness.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sender, "health-reports@example.com");
    assert_eq!(
        sent[0].recipients,
        vec!["ops@example.com", "security@example.com"]
    );
    let raw = String::from_utf8_lossy(&sent[0].raw_message);
    assert!(raw.contains("[CRITICAL]"));
    assert!(raw.contains("attachment"));

    let email = summary
        .delivery(DestinationKind::Email)
        .expect("email delivery recorded");
    assert!(email.succeeded);

    assert_eq!(harness.metrics.namespaces(), vec!["HealthEventsAnalysis"]);
    assert_eq!(harness.metrics.functions(), vec!["HealthEventsAnalysis"]);
    assert_eq!(harness.metrics.value("TotalEventsProcessed"), Some(5.0));
    assert_eq!(harness.metrics.value("CriticalEventsFound"), Some(3.0));
    assert_eq!(harness.metrics.value("LowRiskEvents"), Some(2.0));
}

#[test]
fn unparsable_entry_defaults_to_medium_and_keeps_the_rest() {
    let harness = Harness::new(
        five_event_source(),
        PromptAwareModel::new(&[("AWS_RDS_CERTIFICATE_ROTATION", "somewhat-bad")]),
    );

    let summary = handle_report_run(&config(), invocation_time(), &harness.adapters())
        .expect("run still completes");

    assert_eq!(summary.status, RunStatus::Succeeded);
    assert_eq!(summary.parse_warnings, 1);
    assert_eq!(summary.tier_counts.medium, 1);
    assert_eq!(summary.tier_counts.low, 4);
    assert_eq!(summary.tier_counts.total(), 5);
}

#[test]
fn external_storage_failure_is_partial_success() {
    let mut harness = Harness::new(five_event_source(), PromptAwareModel::new(&RISK_BY_TYPE));
    harness.store = RecordingStore::denying("customer-share");

    let summary = handle_report_run(&config(), invocation_time(), &harness.adapters())
        .expect("run completes");

    assert_eq!(summary.status, RunStatus::PartialSuccess);
    let internal = summary
        .delivery(DestinationKind::InternalStorage)
        .expect("internal delivery recorded");
    assert!(internal.succeeded);
    let external = summary
        .delivery(DestinationKind::ExternalStorage)
        .expect("external delivery recorded");
    assert!(!external.succeeded);
    assert!(external
        .error
        .as_deref()
        .is_some_and(|error| error.contains("AccessDenied")));

    let writes = harness.store.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0.bucket, "internal-reports");
    assert_eq!(harness.mailer.sent().len(), 1);
}

#[test]
fn unreachable_event_source_produces_nothing() {
    let source = FakeHealthSource {
        listing_error: Some("operation timed out after 3 attempts".to_string()),
        ..FakeHealthSource::default()
    };
    let harness = Harness::new(source, PromptAwareModel::new(&RISK_BY_TYPE));

    let failure = handle_report_run(&config(), invocation_time(), &harness.adapters())
        .expect_err("run fails");

    assert_eq!(failure.error.reason(), "UpstreamUnavailable");
    assert_eq!(failure.summary.status, RunStatus::Failed);
    assert_eq!(
        failure.summary.failure_reason.as_deref(),
        Some("UpstreamUnavailable")
    );
    assert_eq!(harness.model.calls(), 0);
    assert!(harness.store.writes().is_empty());
    assert!(harness.mailer.sent().is_empty());
    assert_eq!(harness.metrics.value("TotalEventsProcessed"), None);
}

#[test]
fn unreachable_model_fails_before_any_delivery() {
    let harness = Harness::new(five_event_source(), PromptAwareModel::unreachable());

    let failure = handle_report_run(&config(), invocation_time(), &harness.adapters())
        .expect_err("run fails");

    assert_eq!(failure.error.reason(), "ModelUnavailable");
    assert_eq!(failure.summary.events_processed, 5);
    assert!(failure.to_string().contains("ReadTimeout"));
    assert!(harness.store.writes().is_empty());
    assert!(harness.mailer.sent().is_empty());
}

#[test]
fn email_failure_keeps_completed_storage_writes() {
    let mut harness = Harness::new(five_event_source(), PromptAwareModel::new(&RISK_BY_TYPE));
    harness.mailer = CapturingMailer::failing("MessageRejected: Email address is not verified");

    let failure = handle_report_run(&config(), invocation_time(), &harness.adapters())
        .expect_err("run fails");

    assert_eq!(failure.error.reason(), "EmailDeliveryFailure");
    assert_eq!(harness.store.writes().len(), 2);
    assert_eq!(failure.summary.deliveries.len(), 3);
    assert!(failure
        .summary
        .deliveries
        .iter()
        .filter(|delivery| delivery.destination.is_storage())
        .all(|delivery| delivery.succeeded));
    let email = failure
        .summary
        .delivery(DestinationKind::Email)
        .expect("email delivery recorded");
    assert!(!email.succeeded);
    assert_eq!(email.target, "ops@example.com,security@example.com");
    assert!(email
        .error
        .as_deref()
        .is_some_and(|error| error.contains("MessageRejected")));
    assert_eq!(harness.metrics.value("TotalEventsProcessed"), Some(5.0));

    let message = failure.invocation_message();
    assert!(message.starts_with("EmailDeliveryFailure: "));
    assert!(message.contains(&failure.summary.run_fingerprint));
    assert!(message.contains("s3://customer-share/health/weekly/health_2025-10-09.xlsx"));
}

#[test]
fn metrics_failure_is_swallowed() {
    let mut harness = Harness::new(five_event_source(), PromptAwareModel::new(&RISK_BY_TYPE));
    harness.metrics = RecordingMetrics::failing();

    let summary = handle_report_run(&config(), invocation_time(), &harness.adapters())
        .expect("run succeeds");

    assert_eq!(summary.status, RunStatus::Succeeded);
    assert_eq!(harness.mailer.sent().len(), 1);
}

#[test]
fn metrics_use_configured_namespace_and_function() {
    let harness = Harness::new(five_event_source(), PromptAwareModel::new(&RISK_BY_TYPE));
    let config = config_with(&[
        ("METRICS_NAMESPACE", "Acme/Health"),
        ("METRICS_FUNCTION_DIMENSION", "acme-weekly-health"),
    ]);

    handle_report_run(&config, invocation_time(), &harness.adapters()).expect("run succeeds");

    assert_eq!(harness.metrics.namespaces(), vec!["Acme/Health"]);
    assert_eq!(harness.metrics.functions(), vec!["acme-weekly-health"]);
}

#[test]
fn empty_window_skips_report_and_email() {
    let harness = Harness::new(
        FakeHealthSource::default(),
        PromptAwareModel::new(&RISK_BY_TYPE),
    );

    let summary = handle_report_run(&config(), invocation_time(), &harness.adapters())
        .expect("run succeeds");

    assert_eq!(summary.status, RunStatus::NoEvents);
    assert_eq!(summary.attachment_name, None);
    assert_eq!(harness.model.calls(), 0);
    assert!(harness.store.writes().is_empty());
    assert!(harness.mailer.sent().is_empty());
}

#[test]
fn excluded_services_and_internal_only_storage() {
    let harness = Harness::new(five_event_source(), PromptAwareModel::new(&RISK_BY_TYPE));
    let config = config_with(&[("EXCLUDED_SERVICES", "lambda"), ("S3_BUCKET_NAME", "")]);

    let summary =
        handle_report_run(&config, invocation_time(), &harness.adapters()).expect("run succeeds");

    assert_eq!(summary.events_processed, 3);
    assert_eq!(summary.tier_counts.critical, 3);
    assert_eq!(summary.delivery(DestinationKind::ExternalStorage), None);
    assert_eq!(harness.store.writes().len(), 1);
}

#[test]
fn disabled_schedule_only_blocks_scheduled_triggers() {
    let config = config_with(&[("SCHEDULE_ENABLED", "false")]);
    let scheduled = trigger_source(&json!({"source": "aws.events", "detail-type": "Scheduled Event"}));

    assert_eq!(scheduled, TriggerSource::Scheduled);
    assert!(!should_run(&config, scheduled));
    assert!(should_run(&config, trigger_source(&json!({"manual": true}))));
}
