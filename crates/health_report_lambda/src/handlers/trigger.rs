use health_report_core::config::AnalysisConfig;
use health_report_core::contract::{RunStatus, RunSummary};
use serde::Serialize;
use serde_json::Value;

pub const SCHEDULED_EVENT_SOURCE: &str = "aws.events";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Scheduled,
    Manual,
}

/// Any payload is accepted; only an EventBridge event counts as scheduled.
pub fn trigger_source(event: &Value) -> TriggerSource {
    match event.get("source").and_then(Value::as_str) {
        Some(SCHEDULED_EVENT_SOURCE) => TriggerSource::Scheduled,
        _ => TriggerSource::Manual,
    }
}

/// The schedule switch only gates scheduled invocations.
pub fn should_run(config: &AnalysisConfig, source: TriggerSource) -> bool {
    config.schedule_enabled || source == TriggerSource::Manual
}

pub fn skipped_summary() -> RunSummary {
    RunSummary::new(RunStatus::Skipped, String::new())
}
