//! Risk classification of health events through a generative model.
//!
//! Everything here is pure: batches are planned, request bodies built, and
//! response bodies turned into [`ClassifiedEvent`]s without touching the
//! network. The runtime crate only moves bytes to and from the model.

mod batching;
mod parser;
mod payload;
mod prompt;

use std::ops::Range;

pub use batching::plan_batches;
pub use parser::{parse_batch_response, EventAssessment};
pub use payload::{
    build_model_request, extract_completion_text, Completion, ModelFamily, ModelRequest,
    ANTHROPIC_VERSION, MODEL_CONTENT_TYPE,
};
pub use prompt::{build_batch_prompt, estimate_tokens, render_event, SYSTEM_INSTRUCTION};

use crate::config::ModelSettings;
use crate::contract::{ClassifiedEvent, HealthEvent, RiskTier};

pub const MAX_TOKENS: u32 = 4000;
pub const TEMPERATURE: f64 = 0.3;
pub const CHARS_PER_TOKEN: usize = 4;
pub const MAX_DESCRIPTION_CHARS: usize = 6_000;
pub const INPUT_TOKEN_BUDGET: usize = 12_000;

pub const FALLBACK_TIME_SENSITIVITY: &str = "Routine";
pub const FALLBACK_RISK_CATEGORY: &str = "Unknown";
pub const FALLBACK_REQUIRED_ACTIONS: &str = "Review event details manually";
pub const FALLBACK_IMPACT: &str = "Unable to automatically analyze this event";
pub const FALLBACK_CONSEQUENCES: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct BatchPlan {
    pub range: Range<usize>,
    pub request: ModelRequest,
}

pub fn plan_requests(events: &[HealthEvent], settings: &ModelSettings) -> Vec<BatchPlan> {
    let costs: Vec<usize> = events
        .iter()
        .enumerate()
        .map(|(index, event)| estimate_tokens(&render_event(index + 1, event)))
        .collect();

    plan_batches(&costs, settings.max_events_per_batch, INPUT_TOKEN_BUDGET)
        .into_iter()
        .map(|range| {
            let prompt = build_batch_prompt(&events[range.clone()]);
            BatchPlan {
                request: build_model_request(settings, &prompt),
                range,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledBatch {
    pub rows: Vec<ClassifiedEvent>,
    /// The model stopped at `MAX_TOKENS`, so trailing entries may be missing.
    pub truncated: bool,
}

/// Turns one model response body into one classification per batch event.
///
/// Never fails: anything unreadable becomes a Medium fallback with a warning.
pub fn assemble_batch(events: &[HealthEvent], family: ModelFamily, body: &[u8]) -> AssembledBatch {
    let completion = match extract_completion_text(family, body) {
        Ok(completion) => completion,
        Err(reason) => {
            let warning = format!("model response could not be decoded: {reason}");
            return AssembledBatch {
                rows: events
                    .iter()
                    .map(|event| fallback_classification(event.clone(), warning.clone()))
                    .collect(),
                truncated: false,
            };
        }
    };

    let rows = events
        .iter()
        .zip(parse_batch_response(&completion.text, events.len()))
        .map(|(event, assessment)| match assessment {
            Ok(assessment) => assessment.into_classified(event.clone()),
            Err(warning) if completion.truncated => fallback_classification(
                event.clone(),
                format!("{warning} (response stopped at the token limit)"),
            ),
            Err(warning) => fallback_classification(event.clone(), warning),
        })
        .collect();

    AssembledBatch {
        rows,
        truncated: completion.truncated,
    }
}

pub fn fallback_classification(event: HealthEvent, warning: String) -> ClassifiedEvent {
    ClassifiedEvent {
        event,
        tier: RiskTier::Medium,
        rationale: format!("Automatic classification unavailable: {warning}"),
        impact_summary: FALLBACK_IMPACT.to_string(),
        time_sensitivity: FALLBACK_TIME_SENSITIVITY.to_string(),
        risk_category: FALLBACK_RISK_CATEGORY.to_string(),
        required_actions: FALLBACK_REQUIRED_ACTIONS.to_string(),
        consequences_if_ignored: FALLBACK_CONSEQUENCES.to_string(),
        analysis_text: FALLBACK_IMPACT.to_string(),
        parse_warning: Some(warning),
    }
}
