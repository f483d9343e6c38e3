use health_report_core::contract::HealthEvent;
use health_report_core::fetch::EventQuery;
use serde_json::json;

use crate::handlers::logging::{log_info, log_warn};

const COMPONENT: &str = "event_source";

/// Read access to the health event API.
///
/// `list_events` returns every page for the query with descriptions and
/// entities left empty; the fetch stage fills them in per event. Account ids
/// are only meaningful in the organization view, where `account_id` scopes
/// the detail calls.
pub trait HealthEventSource {
    fn list_events(&self, query: &EventQuery) -> Result<Vec<HealthEvent>, String>;

    fn event_description(
        &self,
        event_arn: &str,
        account_id: Option<&str>,
    ) -> Result<Option<String>, String>;

    fn affected_entities(
        &self,
        event_arn: &str,
        account_id: Option<&str>,
    ) -> Result<Vec<String>, String>;

    /// Empty outside the organization view.
    fn affected_accounts(&self, event_arn: &str) -> Result<Vec<String>, String>;
}

/// Resolves an organization-view detail lookup, retrying it through the
/// account-view API when the organization call fails or comes back empty.
///
/// An empty organization result stays the answer when the account call fails.
/// An organization error only surfaces when the account call fails too.
pub fn with_account_fallback<T>(
    lookup: &str,
    event_arn: &str,
    organization: Result<T, String>,
    is_empty: impl Fn(&T) -> bool,
    account: impl FnOnce() -> Result<T, String>,
) -> Result<T, String> {
    let organization_error = match organization {
        Ok(value) if !is_empty(&value) => return Ok(value),
        Ok(value) => {
            return Ok(match account() {
                Ok(fallback) if !is_empty(&fallback) => {
                    log_info(
                        COMPONENT,
                        "account_fallback_used",
                        json!({ "lookup": lookup, "event_arn": event_arn, "cause": "empty" }),
                    );
                    fallback
                }
                _ => value,
            })
        }
        Err(error) => error,
    };

    match account() {
        Ok(fallback) => {
            log_warn(
                COMPONENT,
                "account_fallback_used",
                json!({
                    "lookup": lookup,
                    "event_arn": event_arn,
                    "cause": "error",
                    "error": organization_error,
                }),
            );
            Ok(fallback)
        }
        Err(account_error) => Err(format!(
            "{organization_error}; account-level fallback failed: {account_error}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(items: &[&str]) -> Result<Vec<String>, String> {
        Ok(items.iter().map(|item| item.to_string()).collect())
    }

    #[test]
    fn organization_result_wins_when_present() {
        let resolved = with_account_fallback(
            "entities",
            "arn:1",
            entities(&["i-org"]),
            Vec::is_empty,
            || panic!("account view should not be queried"),
        );
        assert_eq!(resolved, entities(&["i-org"]));
    }

    #[test]
    fn empty_organization_result_retries_account_view() {
        let resolved = with_account_fallback(
            "entities",
            "arn:1",
            entities(&[]),
            Vec::is_empty,
            || entities(&["i-account"]),
        );
        assert_eq!(resolved, entities(&["i-account"]));

        let still_empty = with_account_fallback(
            "entities",
            "arn:1",
            entities(&[]),
            Vec::is_empty,
            || Err("AccessDenied".to_string()),
        );
        assert_eq!(still_empty, entities(&[]));
    }

    #[test]
    fn organization_error_recovers_through_account_view() {
        let resolved = with_account_fallback(
            "description",
            "arn:1",
            Err("Throttling".to_string()),
            Option::is_none,
            || Ok(Some("Account-level details".to_string())),
        );
        assert_eq!(resolved, Ok(Some("Account-level details".to_string())));
    }

    #[test]
    fn both_views_failing_reports_both_errors() {
        let error = with_account_fallback(
            "description",
            "arn:1",
            Err::<Option<String>, _>("Throttling".to_string()),
            Option::is_none,
            || Err("AccessDenied".to_string()),
        )
        .expect_err("both lookups failed");

        assert!(error.contains("Throttling"));
        assert!(error.contains("AccessDenied"));
    }
}
