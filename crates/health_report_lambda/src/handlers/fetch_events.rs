use health_report_core::config::AnalysisConfig;
use health_report_core::contract::{AnalysisWindow, HealthEvent};
use health_report_core::fetch::{
    expand_by_account, merge_and_filter, order_events, plan_queries, resolve_description,
    FetchStats,
};
use serde_json::json;

use crate::adapters::event_source::HealthEventSource;
use crate::handlers::logging::{log_info, log_warn};

const COMPONENT: &str = "fetcher";

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedEvents {
    pub events: Vec<HealthEvent>,
    pub stats: FetchStats,
}

/// Lists, merges, expands and enriches the events for one window.
///
/// Listing and description failures abort the fetch. Account and entity
/// lookups degrade to empty lists.
pub fn fetch_events(
    source: &dyn HealthEventSource,
    window: &AnalysisWindow,
    config: &AnalysisConfig,
) -> Result<FetchedEvents, String> {
    let mut batches = Vec::new();
    for query in plan_queries(window, &config.event_categories) {
        let listed = source.list_events(&query)?;
        log_info(
            COMPONENT,
            "events_listed",
            json!({
                "query": query.kind,
                "count": listed.len(),
            }),
        );
        batches.push(listed);
    }

    let (merged, mut stats) =
        merge_and_filter(batches, &config.event_categories, &config.excluded_services);
    let unique_events = merged.len();

    let mut events = Vec::with_capacity(unique_events);
    for event in merged {
        let accounts = match source.affected_accounts(&event.arn) {
            Ok(accounts) => accounts,
            Err(error) => {
                log_warn(
                    COMPONENT,
                    "affected_accounts_unavailable",
                    json!({ "event_arn": event.arn, "error": error }),
                );
                Vec::new()
            }
        };
        for expanded in expand_by_account(event, &accounts) {
            events.push(enrich(source, expanded)?);
        }
    }
    stats.expanded = events.len().saturating_sub(unique_events);
    order_events(&mut events);

    log_info(
        COMPONENT,
        "events_fetched",
        json!({
            "events": events.len(),
            "stats": stats,
        }),
    );
    Ok(FetchedEvents { events, stats })
}

fn enrich(source: &dyn HealthEventSource, mut event: HealthEvent) -> Result<HealthEvent, String> {
    let account = event.account_id.clone();
    let description = source
        .event_description(&event.arn, account.as_deref())
        .map_err(|error| format!("failed to describe event {}: {error}", event.arn))?;
    event.description = resolve_description(description.as_deref());

    event.affected_entities = match source.affected_entities(&event.arn, account.as_deref()) {
        Ok(entities) => entities,
        Err(error) => {
            log_warn(
                COMPONENT,
                "affected_entities_unavailable",
                json!({ "event_arn": event.arn, "account_id": account, "error": error }),
            );
            Vec::new()
        }
    };
    Ok(event)
}
