use std::fmt::Write as _;

use super::{CHARS_PER_TOKEN, MAX_DESCRIPTION_CHARS};
use crate::contract::HealthEvent;

pub const SYSTEM_INSTRUCTION: &str = "You are an AWS expert specializing in outage analysis and business continuity. \
Your task is to analyze AWS Health events and determine their potential impact on workload availability, \
system connectivity, and service outages.

For every event consider:
1. Will this event cause workload downtime if required actions are not taken?
2. Will there be any service outages associated with this event?
3. Will the application or workload experience network integration issues between connecting systems?
4. What specific AWS services or resources could be impacted?

CRITICAL EVENT CRITERIA:
- Any event that will cause service downtime must be marked as critical
- Any event that will cause network integration or SSL issues between systems must be marked as critical
- Any event that requires immediate action to prevent an outage must use Urgent time sensitivity
- Events with high impact but no immediate downtime must be marked as high

RISK LEVEL GUIDELINES:
- critical: will cause a service outage or severe disruption if not addressed
- high: significant impact but not an immediate outage
- medium: moderate impact requiring attention
- low: minimal impact, routine maintenance

Respond with a single ```json fenced block containing a JSON array with exactly one object per event, in this shape:
{
  \"event_index\": number,
  \"risk_level\": \"critical|high|medium|low\",
  \"critical\": boolean,
  \"rationale\": \"string\",
  \"impact_analysis\": \"string\",
  \"time_sensitivity\": \"Routine|Urgent|Critical\",
  \"risk_category\": \"Availability|Security|Performance|Cost|Compliance\",
  \"required_actions\": \"string\",
  \"consequences_if_ignored\": \"string\"
}

In impact_analysis be specific about potential outages and their estimated duration, connectivity issues \
between systems, and whether downtime follows if no action is taken. In consequences_if_ignored state \
what disruption occurs if the event is not addressed.";

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// One numbered event block. `index` is the 1-based `event_index`.
pub fn render_event(index: usize, event: &HealthEvent) -> String {
    let regions = if event.regions.is_empty() {
        "N/A".to_string()
    } else {
        event.regions.join(", ")
    };
    let start = event
        .start_time
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let mut block = String::new();
    let _ = writeln!(block, "### Event {index}");
    let _ = writeln!(block, "- event_index: {index}");
    let _ = writeln!(block, "- Type: {}", event.event_type_code);
    let _ = writeln!(block, "- Category: {}", event.category);
    let _ = writeln!(block, "- Service: {}", event.service);
    let _ = writeln!(block, "- Region: {regions}");
    let _ = writeln!(block, "- Start Time: {start}");
    let _ = writeln!(block, "- Description:");
    let _ = writeln!(block, "{}", truncate_chars(&event.description, MAX_DESCRIPTION_CHARS));
    block
}

pub fn build_batch_prompt(events: &[HealthEvent]) -> String {
    let mut prompt = format!(
        "Analyze the following {} AWS Health event(s). Return one JSON object per event_index.\n\n",
        events.len()
    );
    for (offset, event) in events.iter().enumerate() {
        prompt.push_str(&render_event(offset + 1, event));
        prompt.push('\n');
    }
    prompt
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}... [truncated]", &text[..cut]),
        None => text.to_string(),
    }
}
