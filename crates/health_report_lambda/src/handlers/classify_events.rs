use health_report_core::classification::{assemble_batch, plan_requests};
use health_report_core::config::ModelSettings;
use health_report_core::contract::{ClassifiedEvent, HealthEvent};
use serde_json::json;

use crate::adapters::model::ModelClient;
use crate::handlers::logging::{log_info, log_warn};

const COMPONENT: &str = "classifier";

/// Classifies events batch by batch, preserving input order.
///
/// Only an unreachable model is an error. Unparsable output is recovered as
/// Medium rows carrying a parse warning.
pub fn classify_events(
    model: &dyn ModelClient,
    events: &[HealthEvent],
    settings: &ModelSettings,
) -> Result<Vec<ClassifiedEvent>, String> {
    let plans = plan_requests(events, settings);
    let batch_count = plans.len();
    let mut classified = Vec::with_capacity(events.len());

    for (batch_index, plan) in plans.into_iter().enumerate() {
        let body = model.invoke_model(&plan.request).map_err(|error| {
            format!(
                "model invocation failed for batch {} of {batch_count}: {error}",
                batch_index + 1
            )
        })?;
        let batch = assemble_batch(&events[plan.range.clone()], plan.request.family, &body);
        if batch.truncated {
            log_warn(
                COMPONENT,
                "model_output_truncated",
                json!({
                    "batch": batch_index + 1,
                    "batches": batch_count,
                    "events": batch.rows.len(),
                }),
            );
        }
        let rows = batch.rows;

        let mut warnings = 0usize;
        for row in rows.iter() {
            if let Some(warning) = &row.parse_warning {
                warnings += 1;
                log_warn(
                    COMPONENT,
                    "classification_parse_warning",
                    json!({
                        "event_arn": row.event.arn,
                        "account_id": row.event.account_id,
                        "warning": warning,
                    }),
                );
            }
        }
        log_info(
            COMPONENT,
            "batch_classified",
            json!({
                "batch": batch_index + 1,
                "batches": batch_count,
                "events": rows.len(),
                "parse_warnings": warnings,
            }),
        );
        classified.extend(rows);
    }

    Ok(classified)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use health_report_core::classification::ModelRequest;
    use health_report_core::contract::{EventStatus, RiskTier};

    use super::*;

    struct CannedModel {
        responses: Mutex<Vec<Result<Vec<u8>, String>>>,
        calls: Mutex<usize>,
    }

    impl CannedModel {
        fn new(responses: Vec<Result<Vec<u8>, String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            }
        }
    }

    impl ModelClient for CannedModel {
        fn invoke_model(&self, _request: &ModelRequest) -> Result<Vec<u8>, String> {
            *self.calls.lock().expect("poisoned mutex") += 1;
            self.responses.lock().expect("poisoned mutex").remove(0)
        }
    }

    fn body(text: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({"content": [{"type": "text", "text": text}]}))
            .expect("body serializes")
    }

    fn events(count: usize) -> Vec<HealthEvent> {
        (0..count)
            .map(|index| HealthEvent {
                arn: format!("arn:{index}"),
                service: "RDS".to_string(),
                event_type_code: "AWS_RDS_MAINTENANCE_SCHEDULED".to_string(),
                category: "scheduledChange".to_string(),
                status: EventStatus::Upcoming,
                start_time: None,
                end_time: None,
                last_updated_time: None,
                regions: Vec::new(),
                account_id: None,
                description: "maintenance".to_string(),
                affected_entities: Vec::new(),
            })
            .collect()
    }

    fn settings(max_events_per_batch: usize) -> ModelSettings {
        ModelSettings {
            model_id: "anthropic.claude-3-haiku-20240307-v1:0".to_string(),
            top_p: 0.9,
            max_events_per_batch,
        }
    }

    #[test]
    fn classifies_across_batches_in_order() {
        let model = CannedModel::new(vec![
            Ok(body(
                r#"[{"event_index":1,"risk_level":"high"},{"event_index":2,"risk_level":"low"}]"#,
            )),
            Ok(body(r#"[{"event_index":1,"risk_level":"critical"}]"#)),
        ]);

        let rows = classify_events(&model, &events(3), &settings(2)).expect("classification runs");

        let tiers: Vec<RiskTier> = rows.iter().map(|row| row.tier).collect();
        assert_eq!(tiers, vec![RiskTier::High, RiskTier::Low, RiskTier::Critical]);
        assert_eq!(rows[2].event.arn, "arn:2");
        assert_eq!(*model.calls.lock().expect("poisoned mutex"), 2);
    }

    #[test]
    fn unreachable_model_is_an_error() {
        let model = CannedModel::new(vec![Err("connection timed out".to_string())]);
        let error =
            classify_events(&model, &events(1), &settings(8)).expect_err("classification fails");
        assert!(error.contains("connection timed out"));
    }

    #[test]
    fn garbage_response_becomes_warnings_not_errors() {
        let model = CannedModel::new(vec![Ok(body("I cannot help with that."))]);
        let rows = classify_events(&model, &events(2), &settings(8)).expect("classification runs");

        assert!(rows
            .iter()
            .all(|row| row.tier == RiskTier::Medium && row.parse_warning.is_some()));
    }

    #[test]
    fn truncated_batch_keeps_completed_entries() {
        let response = serde_json::to_vec(&json!({
            "content": [{
                "type": "text",
                "text": r#"[{"event_index":1,"risk_level":"critical"},{"event_index":2,"risk_le"#,
            }],
            "stop_reason": "max_tokens",
        }))
        .expect("body serializes");
        let model = CannedModel::new(vec![Ok(response)]);

        let rows = classify_events(&model, &events(2), &settings(8)).expect("classification runs");

        assert_eq!(rows[0].tier, RiskTier::Critical);
        assert!(rows[0].parse_warning.is_none());
        assert_eq!(rows[1].tier, RiskTier::Medium);
        assert!(rows[1].parse_warning.is_some());
    }
}
