use health_report_core::metrics::{report_metrics, MetricsTarget};
use health_report_core::report::Report;
use serde_json::json;

use crate::adapters::metrics_sink::MetricsSink;
use crate::handlers::logging::{log_info, log_warn};

const COMPONENT: &str = "metrics";

/// Fire-and-forget: failures are logged and reported as `false`.
pub fn publish_report_metrics(
    sink: &dyn MetricsSink,
    target: &MetricsTarget,
    report: &Report,
) -> bool {
    let data = report_metrics(report);
    match sink.publish(target, &data) {
        Ok(()) => {
            log_info(
                COMPONENT,
                "metrics_published",
                json!({
                    "namespace": target.namespace,
                    "function": target.function,
                    "metrics": data.len(),
                }),
            );
            true
        }
        Err(error) => {
            log_warn(
                COMPONENT,
                "metric_publish_failed",
                json!({ "namespace": target.namespace, "error": error }),
            );
            false
        }
    }
}
