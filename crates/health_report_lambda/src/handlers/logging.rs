//! Structured log helpers shared by the run stages.
//!
//! Every record carries `component` and `event` fields plus a JSON `details`
//! object; the binary's subscriber adds level and timestamp.

use serde_json::Value;

pub fn log_info(component: &str, event: &str, details: Value) {
    tracing::info!(component, event, %details);
}

pub fn log_warn(component: &str, event: &str, details: Value) {
    tracing::warn!(component, event, %details);
}

pub fn log_error(component: &str, event: &str, details: Value) {
    tracing::error!(component, event, %details);
}
