use health_report_core::metrics::{MetricDatum, MetricsTarget};

pub trait MetricsSink {
    fn publish(&self, target: &MetricsTarget, data: &[MetricDatum]) -> Result<(), String>;
}
