use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const RUN_SUMMARY_SCHEMA_VERSION: &str = "v1";
pub const NO_DESCRIPTION: &str = "No description available";

/// Risk tier assigned to every classified event.
///
/// Declaration order is severity order, so `Ord` sorts Critical first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Critical,
    High,
    Medium,
    Low,
}

impl RiskTier {
    pub const ALL: [RiskTier; 4] = [
        RiskTier::Critical,
        RiskTier::High,
        RiskTier::Medium,
        RiskTier::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }

    /// Normalizes the free-form tier names models tend to produce.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" | "severe" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" | "moderate" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Open,
    Closed,
    Upcoming,
    Unknown,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Upcoming => "upcoming",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "upcoming" => Self::Upcoming,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }
}

/// A health event as fetched from the event source. Never mutated downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEvent {
    pub arn: String,
    pub service: String,
    pub event_type_code: String,
    pub category: String,
    pub status: EventStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated_time: Option<DateTime<Utc>>,
    pub regions: Vec<String>,
    pub account_id: Option<String>,
    pub description: String,
    pub affected_entities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    pub event: HealthEvent,
    pub tier: RiskTier,
    pub rationale: String,
    pub impact_summary: String,
    pub time_sensitivity: String,
    pub risk_category: String,
    pub required_actions: String,
    pub consequences_if_ignored: String,
    pub analysis_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_warning: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TierCounts {
    pub fn from_tiers(tiers: impl IntoIterator<Item = RiskTier>) -> Self {
        let mut counts = Self::default();
        for tier in tiers {
            counts.record(tier);
        }
        counts
    }

    pub fn record(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Critical => self.critical += 1,
            RiskTier::High => self.high += 1,
            RiskTier::Medium => self.medium += 1,
            RiskTier::Low => self.low += 1,
        }
    }

    pub fn get(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::Critical => self.critical,
            RiskTier::High => self.high,
            RiskTier::Medium => self.medium,
            RiskTier::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationKind {
    InternalStorage,
    ExternalStorage,
    Email,
}

impl DestinationKind {
    pub fn is_storage(self) -> bool {
        matches!(self, Self::InternalStorage | Self::ExternalStorage)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub destination: DestinationKind,
    pub target: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn success(destination: DestinationKind, target: impl Into<String>) -> Self {
        Self {
            destination,
            target: target.into(),
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(
        destination: DestinationKind,
        target: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            destination,
            target: target.into(),
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    PartialSuccess,
    NoEvents,
    Skipped,
    Failed,
}

impl RunStatus {
    /// Storage failures degrade the run; they never fail it.
    pub fn from_deliveries(deliveries: &[DeliveryResult]) -> Self {
        if deliveries.iter().all(|delivery| delivery.succeeded) {
            Self::Succeeded
        } else {
            Self::PartialSuccess
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub schema_version: String,
    pub run_fingerprint: String,
    pub events_processed: usize,
    pub filtered_events: usize,
    pub tier_counts: TierCounts,
    pub parse_warnings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
    pub deliveries: Vec<DeliveryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl RunSummary {
    pub fn new(status: RunStatus, run_fingerprint: impl Into<String>) -> Self {
        Self {
            status,
            schema_version: RUN_SUMMARY_SCHEMA_VERSION.to_string(),
            run_fingerprint: run_fingerprint.into(),
            events_processed: 0,
            filtered_events: 0,
            tier_counts: TierCounts::default(),
            parse_warnings: 0,
            attachment_name: None,
            deliveries: Vec::new(),
            failure_reason: None,
        }
    }

    pub fn delivery(&self, destination: DestinationKind) -> Option<&DeliveryResult> {
        self.deliveries
            .iter()
            .find(|delivery| delivery.destination == destination)
    }
}
