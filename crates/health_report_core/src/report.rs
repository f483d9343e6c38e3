use serde::Serialize;

use crate::contract::{AnalysisWindow, ClassifiedEvent, RiskTier, TierCounts};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportContext {
    pub customer_name: String,
    pub window: AnalysisWindow,
    pub category_filter: String,
    pub filtered_events: usize,
}

/// Classified rows in fetch order plus their per-tier counts.
///
/// Counts are derived from the rows at construction and the rows cannot be
/// changed afterwards, so the two always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    context: ReportContext,
    rows: Vec<ClassifiedEvent>,
    counts: TierCounts,
    parse_warnings: usize,
}

impl Report {
    pub fn build(context: ReportContext, rows: Vec<ClassifiedEvent>) -> Self {
        let counts = TierCounts::from_tiers(rows.iter().map(|row| row.tier));
        let parse_warnings = rows
            .iter()
            .filter(|row| row.parse_warning.is_some())
            .count();
        Self {
            context,
            rows,
            counts,
            parse_warnings,
        }
    }

    pub fn context(&self) -> &ReportContext {
        &self.context
    }

    pub fn rows(&self) -> &[ClassifiedEvent] {
        &self.rows
    }

    pub fn counts(&self) -> TierCounts {
        self.counts
    }

    pub fn parse_warnings(&self) -> usize {
        self.parse_warnings
    }

    pub fn rows_with_tier(&self, tier: RiskTier) -> impl Iterator<Item = &ClassifiedEvent> {
        self.rows.iter().filter(move |row| row.tier == tier)
    }

    pub fn critical_rows(&self) -> impl Iterator<Item = &ClassifiedEvent> {
        self.rows_with_tier(RiskTier::Critical)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::classification::fallback_classification;
    use crate::contract::{EventStatus, HealthEvent};

    fn classified(arn: &str, tier: RiskTier) -> ClassifiedEvent {
        let event = HealthEvent {
            arn: arn.to_string(),
            service: "EC2".to_string(),
            event_type_code: "AWS_EC2_INSTANCE_RETIREMENT_SCHEDULED".to_string(),
            category: "scheduledChange".to_string(),
            status: EventStatus::Upcoming,
            start_time: None,
            end_time: None,
            last_updated_time: None,
            regions: vec!["us-east-1".to_string()],
            account_id: None,
            description: "Instance retirement".to_string(),
            affected_entities: vec!["i-0abc".to_string()],
        };
        let mut row = fallback_classification(event, "placeholder".to_string());
        row.tier = tier;
        row.parse_warning = None;
        row
    }

    fn context() -> ReportContext {
        let end = DateTime::<Utc>::from_timestamp(1_760_000_000, 0).expect("valid timestamp");
        ReportContext {
            customer_name: "Acme".to_string(),
            window: AnalysisWindow::ending_at(end, 8),
            category_filter: "accountNotification".to_string(),
            filtered_events: 0,
        }
    }

    #[test]
    fn counts_sum_to_row_count() {
        let tiers = [
            RiskTier::Critical,
            RiskTier::Low,
            RiskTier::Critical,
            RiskTier::High,
            RiskTier::Medium,
            RiskTier::Critical,
        ];
        let rows: Vec<ClassifiedEvent> = tiers
            .iter()
            .enumerate()
            .map(|(i, tier)| classified(&format!("arn:{i}"), *tier))
            .collect();

        let report = Report::build(context(), rows);

        assert_eq!(report.rows().len(), tiers.len());
        assert_eq!(report.counts().total(), report.rows().len());
        assert_eq!(report.counts().critical, 3);
        assert_eq!(report.critical_rows().count(), 3);
        assert_eq!(report.rows()[1].event.arn, "arn:1");
    }

    #[test]
    fn counts_parse_warnings() {
        let mut warned = classified("arn:w", RiskTier::Medium);
        warned.parse_warning = Some("unknown risk_level 'x'".to_string());
        let report = Report::build(context(), vec![warned, classified("arn:ok", RiskTier::Low)]);

        assert_eq!(report.parse_warnings(), 1);
        assert!(!report.is_empty());
    }
}
