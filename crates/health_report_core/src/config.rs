use std::time::Duration;

use crate::error::ValidationError;
use crate::metrics::MetricsTarget;

pub const DEFAULT_REPORT_KEY_PREFIX: &str = "reports";
pub const DEFAULT_ANALYSIS_WINDOW_DAYS: u32 = 8;
pub const MAX_ANALYSIS_WINDOW_DAYS: u32 = 90;
pub const DEFAULT_EVENT_CATEGORIES: &str = "accountNotification";
pub const ALL_CATEGORIES_TOKEN: &str = "all";
pub const DEFAULT_FILENAME_TEMPLATE: &str = "AWS_Health_Events_Analysis_{date}_{time}.xlsx";
pub const DEFAULT_CUSTOMER_NAME: &str = "Notification";
pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-sonnet-20240229-v1:0";
pub const DEFAULT_TOP_P: f64 = 0.9;
pub const DEFAULT_MAX_EVENTS_PER_BATCH: usize = 8;
pub const DEFAULT_MAX_ATTEMPTS_PER_CALL: u32 = 3;
pub const MAX_ATTEMPTS_PER_CALL_LIMIT: u32 = 10;
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_METRICS_NAMESPACE: &str = "HealthEventsAnalysis";
pub const DEFAULT_METRICS_FUNCTION: &str = "HealthEventsAnalysis";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    pub bucket: String,
    pub key_prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model_id: String,
    pub top_p: f64,
    pub max_events_per_batch: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub operation_timeout: Duration,
}

/// Deployment configuration for one report run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub sender: String,
    pub recipients: Vec<String>,
    pub internal_storage: StorageTarget,
    pub external_storage: Option<StorageTarget>,
    pub window_days: u32,
    /// Empty means every category is accepted.
    pub event_categories: Vec<String>,
    pub excluded_services: Vec<String>,
    pub filename_template: String,
    pub schedule_enabled: bool,
    pub customer_name: String,
    pub model: ModelSettings,
    pub retry: RetrySettings,
    pub metrics: MetricsTarget,
}

impl AnalysisConfig {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let sender = required(&get, "SENDER_EMAIL")?;
        let recipients = split_list(&required(&get, "RECIPIENT_EMAILS")?);
        if recipients.is_empty() {
            return Err(ValidationError::new(
                "RECIPIENT_EMAILS must contain at least one address",
            ));
        }

        let internal_storage = StorageTarget {
            bucket: required(&get, "REPORT_BUCKET_NAME")?,
            key_prefix: get("REPORT_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_REPORT_KEY_PREFIX.to_string()),
        };
        let external_storage = get("S3_BUCKET_NAME").map(|bucket| StorageTarget {
            bucket,
            key_prefix: get("S3_KEY_PREFIX").unwrap_or_default(),
        });

        let window_days = parse_number(&get, "ANALYSIS_WINDOW_DAYS", DEFAULT_ANALYSIS_WINDOW_DAYS)?;
        if !(1..=MAX_ANALYSIS_WINDOW_DAYS).contains(&window_days) {
            return Err(ValidationError::new(format!(
                "ANALYSIS_WINDOW_DAYS must be between 1 and {MAX_ANALYSIS_WINDOW_DAYS}"
            )));
        }

        let raw_categories =
            get("EVENT_CATEGORIES").unwrap_or_else(|| DEFAULT_EVENT_CATEGORIES.to_string());
        let event_categories = if raw_categories.eq_ignore_ascii_case(ALL_CATEGORIES_TOKEN) {
            Vec::new()
        } else {
            split_list(&raw_categories)
        };
        let excluded_services = get("EXCLUDED_SERVICES")
            .map(|value| split_list(&value))
            .unwrap_or_default();

        let filename_template = get("EXCEL_FILENAME_TEMPLATE")
            .unwrap_or_else(|| DEFAULT_FILENAME_TEMPLATE.to_string());
        if !filename_template.ends_with(".xlsx") {
            return Err(ValidationError::new(
                "EXCEL_FILENAME_TEMPLATE must end with .xlsx",
            ));
        }

        let schedule_enabled = match get("SCHEDULE_ENABLED") {
            Some(value) => parse_bool("SCHEDULE_ENABLED", &value)?,
            None => true,
        };

        let top_p = parse_number(&get, "BEDROCK_TOP_P", DEFAULT_TOP_P)?;
        if !(top_p > 0.0 && top_p <= 1.0) {
            return Err(ValidationError::new(
                "BEDROCK_TOP_P must be greater than 0 and at most 1",
            ));
        }
        let max_events_per_batch = parse_number(
            &get,
            "BEDROCK_MAX_EVENTS_PER_BATCH",
            DEFAULT_MAX_EVENTS_PER_BATCH,
        )?;
        if max_events_per_batch == 0 {
            return Err(ValidationError::new(
                "BEDROCK_MAX_EVENTS_PER_BATCH must be greater than 0",
            ));
        }

        let max_attempts = parse_number(
            &get,
            "AWS_MAX_ATTEMPTS_PER_CALL",
            DEFAULT_MAX_ATTEMPTS_PER_CALL,
        )?;
        if !(1..=MAX_ATTEMPTS_PER_CALL_LIMIT).contains(&max_attempts) {
            return Err(ValidationError::new(format!(
                "AWS_MAX_ATTEMPTS_PER_CALL must be between 1 and {MAX_ATTEMPTS_PER_CALL_LIMIT}"
            )));
        }
        let timeout_secs = parse_number(
            &get,
            "AWS_OPERATION_TIMEOUT_SECS",
            DEFAULT_OPERATION_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ValidationError::new(
                "AWS_OPERATION_TIMEOUT_SECS must be greater than 0",
            ));
        }

        Ok(Self {
            sender,
            recipients,
            internal_storage,
            external_storage,
            window_days,
            event_categories,
            excluded_services,
            filename_template,
            schedule_enabled,
            customer_name: get("CUSTOMER_NAME")
                .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()),
            model: ModelSettings {
                model_id: get("BEDROCK_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
                top_p,
                max_events_per_batch,
            },
            retry: RetrySettings {
                max_attempts,
                operation_timeout: Duration::from_secs(timeout_secs),
            },
            metrics: MetricsTarget {
                namespace: get("METRICS_NAMESPACE")
                    .unwrap_or_else(|| DEFAULT_METRICS_NAMESPACE.to_string()),
                function: get("METRICS_FUNCTION_DIMENSION")
                    .unwrap_or_else(|| DEFAULT_METRICS_FUNCTION.to_string()),
            },
        })
    }

    /// Human-readable category filter used in the report and email.
    pub fn category_filter_label(&self) -> String {
        if self.event_categories.is_empty() {
            "All categories".to_string()
        } else {
            self.event_categories.join(", ")
        }
    }
}

pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn required<G>(get: &G, name: &str) -> Result<String, ValidationError>
where
    G: Fn(&str) -> Option<String>,
{
    get(name).ok_or_else(|| ValidationError::new(format!("{name} must be configured")))
}

fn parse_number<G, T>(get: &G, name: &str, default: T) -> Result<T, ValidationError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ValidationError::new(format!("{name} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ValidationError::new(format!(
            "{name} must be true or false, got '{value}'"
        ))),
    }
}
