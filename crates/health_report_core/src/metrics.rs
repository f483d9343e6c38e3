use crate::report::Report;

pub const METRIC_DIMENSION_NAME: &str = "Function";

/// Namespace and `Function` dimension value every run counter is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsTarget {
    pub namespace: String,
    pub function: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDatum {
    pub name: &'static str,
    pub value: f64,
}

impl MetricDatum {
    fn count(name: &'static str, value: usize) -> Self {
        Self {
            name,
            value: value as f64,
        }
    }
}

/// Run counters published once per report, all with unit Count.
pub fn report_metrics(report: &Report) -> Vec<MetricDatum> {
    let counts = report.counts();
    vec![
        MetricDatum::count("TotalEventsProcessed", report.rows().len()),
        MetricDatum::count("CriticalEventsFound", counts.critical),
        MetricDatum::count("HighRiskEvents", counts.high),
        MetricDatum::count("MediumRiskEvents", counts.medium),
        MetricDatum::count("LowRiskEvents", counts.low),
        MetricDatum::count("ClassificationWarnings", report.parse_warnings()),
    ]
}
