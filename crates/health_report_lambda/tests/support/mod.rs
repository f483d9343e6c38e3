#![allow(dead_code)]

pub mod fakes;

use chrono::{DateTime, Duration, Utc};
use health_report_core::config::AnalysisConfig;
use health_report_core::contract::{EventStatus, HealthEvent};

/// 2025-10-09 08:53:20 UTC, the invocation time used by every scenario.
pub fn invocation_time() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_760_000_000, 0).expect("valid timestamp")
}

pub fn base_env(name: &str) -> Option<String> {
    let value = match name {
        "SENDER_EMAIL" => "health-reports@example.com",
        "RECIPIENT_EMAILS" => "ops@example.com, security@example.com",
        "REPORT_BUCKET_NAME" => "internal-reports",
        "S3_BUCKET_NAME" => "customer-share",
        "S3_KEY_PREFIX" => "health/weekly/",
        "CUSTOMER_NAME" => "Acme",
        "EVENT_CATEGORIES" => "all",
        "EXCEL_FILENAME_TEMPLATE" => "health_{date}.xlsx",
        _ => return None,
    };
    Some(value.to_string())
}

pub fn config() -> AnalysisConfig {
    AnalysisConfig::from_lookup(base_env).expect("scenario config should parse")
}

pub fn config_with(overrides: &[(&'static str, &'static str)]) -> AnalysisConfig {
    let overrides = overrides.to_vec();
    AnalysisConfig::from_lookup(move |name| {
        overrides
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
            .or_else(|| base_env(name))
    })
    .expect("scenario config should parse")
}

/// An event that started `hours_ago` before the invocation.
pub fn health_event(arn: &str, event_type_code: &str, hours_ago: i64) -> HealthEvent {
    HealthEvent {
        arn: arn.to_string(),
        service: event_type_code
            .split('_')
            .nth(1)
            .unwrap_or("EC2")
            .to_string(),
        event_type_code: event_type_code.to_string(),
        category: "scheduledChange".to_string(),
        status: EventStatus::Upcoming,
        start_time: Some(invocation_time() - Duration::hours(hours_ago)),
        end_time: None,
        last_updated_time: None,
        regions: vec!["eu-west-1".to_string()],
        account_id: None,
        description: String::new(),
        affected_entities: Vec::new(),
    }
}
