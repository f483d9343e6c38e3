use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::contract::{AnalysisWindow, EventStatus, HealthEvent, NO_DESCRIPTION};

pub const PAGE_SIZE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    /// Closed or upcoming events that started and ended inside the window.
    Settled,
    /// Events still open that started inside the window.
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub kind: QueryKind,
    pub start_from: DateTime<Utc>,
    pub end_to: Option<DateTime<Utc>>,
    pub statuses: Vec<EventStatus>,
    pub categories: Vec<String>,
}

pub fn plan_queries(window: &AnalysisWindow, categories: &[String]) -> Vec<EventQuery> {
    vec![
        EventQuery {
            kind: QueryKind::Settled,
            start_from: window.start,
            end_to: Some(window.end),
            statuses: vec![EventStatus::Closed, EventStatus::Upcoming],
            categories: categories.to_vec(),
        },
        EventQuery {
            kind: QueryKind::Open,
            start_from: window.start,
            end_to: None,
            statuses: vec![EventStatus::Open],
            categories: categories.to_vec(),
        },
    ]
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub fetched: usize,
    pub duplicates: usize,
    pub excluded_by_service: usize,
    pub filtered_by_category: usize,
    pub expanded: usize,
}

/// Merges query pages into one event list.
///
/// First occurrence of an ARN wins. Service exclusion is case-insensitive;
/// the category filter is re-applied because the org view has been seen to
/// return events outside the requested categories.
pub fn merge_and_filter(
    batches: Vec<Vec<HealthEvent>>,
    categories: &[String],
    excluded_services: &[String],
) -> (Vec<HealthEvent>, FetchStats) {
    let mut stats = FetchStats::default();
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for event in batches.into_iter().flatten() {
        stats.fetched += 1;
        if !seen.insert(event.arn.clone()) {
            stats.duplicates += 1;
            continue;
        }
        if excluded_services
            .iter()
            .any(|service| service.eq_ignore_ascii_case(&event.service))
        {
            stats.excluded_by_service += 1;
            continue;
        }
        if !categories.is_empty() && !categories.iter().any(|c| c == &event.category) {
            stats.filtered_by_category += 1;
            continue;
        }
        merged.push(event);
    }

    (merged, stats)
}

/// One event per affected account; no accounts keeps the event as-is.
pub fn expand_by_account(event: HealthEvent, accounts: &[String]) -> Vec<HealthEvent> {
    if accounts.is_empty() {
        return vec![event];
    }
    let mut unique: Vec<&String> = accounts.iter().collect();
    unique.sort();
    unique.dedup();
    unique
        .into_iter()
        .map(|account| HealthEvent {
            account_id: Some(account.clone()),
            ..event.clone()
        })
        .collect()
}

/// Start time descending, missing start times last, then ARN and account ascending.
pub fn order_events(events: &mut [HealthEvent]) {
    events.sort_by(|left, right| {
        compare_start_desc(left.start_time, right.start_time)
            .then_with(|| left.arn.cmp(&right.arn))
            .then_with(|| left.account_id.cmp(&right.account_id))
    });
}

fn compare_start_desc(left: Option<DateTime<Utc>>, right: Option<DateTime<Utc>>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn resolve_description(latest: Option<&str>) -> String {
    match latest.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => NO_DESCRIPTION.to_string(),
    }
}
