use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::config::AnalysisConfig;
use crate::contract::AnalysisWindow;

/// The normalized inputs that determine what a run reports on.
///
/// Two runs with the same request cover the same events, so their fingerprints
/// match even when they were triggered seconds apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub event_categories: Vec<String>,
    pub excluded_services: Vec<String>,
}

impl AnalysisRequest {
    pub fn new(config: &AnalysisConfig, window: &AnalysisWindow) -> Self {
        let mut event_categories = config.event_categories.clone();
        event_categories.sort();
        event_categories.dedup();
        let mut excluded_services = config.excluded_services.clone();
        excluded_services.sort();
        excluded_services.dedup();

        Self {
            window_start: truncate_to_minute(window.start),
            window_end: truncate_to_minute(window.end),
            event_categories,
            excluded_services,
        }
    }
}

pub fn request_fingerprint(request: &AnalysisRequest) -> String {
    let stable = json!({
        "window_start": request.window_start.to_rfc3339(),
        "window_end": request.window_end.to_rfc3339(),
        "event_categories": request.event_categories,
        "excluded_services": request.excluded_services,
    });
    let mut hasher = Sha256::new();
    hasher.update(stable.to_string());
    format!("{:x}", hasher.finalize())
}

pub fn run_fingerprint(config: &AnalysisConfig, window: &AnalysisWindow) -> String {
    request_fingerprint(&AnalysisRequest::new(config, window))
}

fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(TimeDelta::minutes(1)).unwrap_or(at)
}
