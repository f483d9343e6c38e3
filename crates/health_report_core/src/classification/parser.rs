use serde_json::Value;

use crate::contract::{ClassifiedEvent, HealthEvent, RiskTier};

const NOT_PROVIDED: &str = "Not provided";

#[derive(Debug, Clone, PartialEq)]
pub struct EventAssessment {
    pub tier: RiskTier,
    pub rationale: String,
    pub impact_analysis: String,
    pub time_sensitivity: String,
    pub risk_category: String,
    pub required_actions: String,
    pub consequences_if_ignored: String,
    pub raw: String,
}

impl EventAssessment {
    pub fn into_classified(self, event: HealthEvent) -> ClassifiedEvent {
        ClassifiedEvent {
            event,
            tier: self.tier,
            rationale: self.rationale,
            impact_summary: self.impact_analysis,
            time_sensitivity: self.time_sensitivity,
            risk_category: self.risk_category,
            required_actions: self.required_actions,
            consequences_if_ignored: self.consequences_if_ignored,
            analysis_text: self.raw,
            parse_warning: None,
        }
    }
}

/// Parses a batch response into exactly `expected` per-event results.
///
/// Entries are matched by their 1-based `event_index`, or by position when
/// the index is missing. The first entry for an index wins. When the response
/// is not one valid JSON document, each object in it is decoded on its own so
/// a broken or cut-off entry only fails its own slot.
pub fn parse_batch_response(text: &str, expected: usize) -> Vec<Result<EventAssessment, String>> {
    let entries = match decode_entries(text) {
        Ok(entries) => entries.into_iter().map(Ok).collect(),
        Err(reason) => {
            let recovered = recover_entries(text);
            if recovered.is_empty() {
                return vec![Err(reason); expected];
            }
            recovered
        }
    };

    let mut slots: Vec<Option<&Result<Value, RawEntry>>> = vec![None; expected];
    for (position, entry) in entries.iter().enumerate() {
        let index = match entry {
            Ok(value) => value.get("event_index").map(index_value),
            Err(raw) => raw.event_index.map(Some),
        };
        let slot = match index {
            Some(index) => index.and_then(|index| index.checked_sub(1)),
            None => Some(position),
        };
        if let Some(slot) = slot.filter(|slot| *slot < expected) {
            if slots[slot].is_none() {
                slots[slot] = Some(entry);
            }
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(slot, entry)| match entry {
            Some(Ok(entry)) => assess(entry),
            Some(Err(raw)) => Err(raw.error.clone()),
            None => Err(format!("model returned no entry for event_index {}", slot + 1)),
        })
        .collect()
}

/// An object span that balanced but did not decode.
#[derive(Debug, Clone)]
struct RawEntry {
    event_index: Option<usize>,
    error: String,
}

fn index_value(index: &Value) -> Option<usize> {
    index
        .as_u64()
        .or_else(|| index.as_str().and_then(|raw| raw.trim().parse().ok()))
        .and_then(|index| usize::try_from(index).ok())
}

fn decode_entries(text: &str) -> Result<Vec<Value>, String> {
    let value = decode_document(text)?;

    match value {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut object) => match object.remove("events") {
            Some(Value::Array(entries)) => Ok(entries),
            Some(_) => Err("events field is not an array".to_string()),
            None => Ok(vec![Value::Object(object)]),
        },
        _ => Err("response JSON is neither an array nor an object".to_string()),
    }
}

/// Tries a ```json fence, then the span from the first `[`, then the span
/// from the first `{`. The first candidate that decodes wins.
fn decode_document(text: &str) -> Result<Value, String> {
    let mut first_error = None;
    for candidate in json_candidates(text) {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return Ok(value),
            Err(error) => {
                first_error.get_or_insert_with(|| format!("response is not valid JSON: {error}"));
            }
        }
    }
    Err(first_error.unwrap_or_else(|| "response contains no JSON".to_string()))
}

fn json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    if let Some(fence) = text.find("```json") {
        let content_start = fence + "```json".len();
        if let Some(length) = text[content_start..].find("```") {
            candidates.push(text[content_start..content_start + length].trim());
        }
    }

    let mut spans: Vec<(usize, usize)> = [('[', ']'), ('{', '}')]
        .into_iter()
        .filter_map(|(opening, closing)| {
            let start = text.find(opening)?;
            let end = text.rfind(closing).filter(|end| *end > start)?;
            Some((start, end))
        })
        .collect();
    spans.sort_unstable();
    candidates.extend(spans.into_iter().map(|(start, end)| &text[start..=end]));
    candidates
}

const ENTRY_KEYS: [&str; 3] = ["event_index", "risk_level", "critical"];

/// Walks the text for balanced `{...}` spans and decodes each on its own.
///
/// Decoded objects that look like entries are kept. Other decoded objects and
/// broken spans that contain nested objects are searched inside. A broken
/// span without nested objects becomes a failed entry. An unbalanced tail
/// ends the walk.
fn recover_entries(text: &str) -> Vec<Result<Value, RawEntry>> {
    let mut entries = Vec::new();
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find('{') {
        let start = cursor + offset;
        let Some(length) = balanced_object_len(&text[start..]) else {
            break;
        };
        let span = &text[start..start + length];
        match serde_json::from_str::<Value>(span) {
            Ok(value) if ENTRY_KEYS.iter().any(|key| value.get(*key).is_some()) => {
                entries.push(Ok(value));
                cursor = start + length;
            }
            Ok(_) => cursor = start + 1,
            Err(_) if span[1..].contains('{') => cursor = start + 1,
            Err(error) => {
                entries.push(Err(RawEntry {
                    event_index: loose_event_index(span),
                    error: format!("entry is not valid JSON: {error}"),
                }));
                cursor = start + length;
            }
        }
    }
    entries
}

/// Byte length of the object starting at `text[0] == '{'`, honoring strings.
fn balanced_object_len(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads `"event_index": N` out of a span that is not valid JSON.
fn loose_event_index(span: &str) -> Option<usize> {
    let after_key = &span[span.find("\"event_index\"")? + "\"event_index\"".len()..];
    let value = after_key.trim_start().strip_prefix(':')?.trim_start();
    let value = value.strip_prefix('"').unwrap_or(value);
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

fn assess(entry: &Value) -> Result<EventAssessment, String> {
    if !entry.is_object() {
        return Err("entry is not a JSON object".to_string());
    }

    let flagged_critical = match entry.get("critical") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => false,
    };
    let tier = match entry.get("risk_level").and_then(Value::as_str) {
        _ if flagged_critical => RiskTier::Critical,
        Some(level) => {
            RiskTier::parse(level).ok_or_else(|| format!("unknown risk_level '{level}'"))?
        }
        None => return Err("entry has no risk_level".to_string()),
    };

    Ok(EventAssessment {
        tier,
        rationale: text_field(entry, "rationale", NOT_PROVIDED),
        impact_analysis: text_field(entry, "impact_analysis", NOT_PROVIDED),
        time_sensitivity: text_field(entry, "time_sensitivity", "Routine"),
        risk_category: text_field(entry, "risk_category", "Unknown"),
        required_actions: text_field(entry, "required_actions", NOT_PROVIDED),
        consequences_if_ignored: text_field(entry, "consequences_if_ignored", NOT_PROVIDED),
        raw: serde_json::to_string_pretty(entry).unwrap_or_else(|_| entry.to_string()),
    })
}

fn text_field(entry: &Value, key: &str, default: &str) -> String {
    match entry.get(key) {
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.trim().to_string(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => default.to_string(),
    }
}
