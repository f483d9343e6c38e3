use serde_json::{json, Value};

use super::prompt::SYSTEM_INSTRUCTION;
use super::{MAX_TOKENS, TEMPERATURE};
use crate::config::ModelSettings;

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
pub const MODEL_CONTENT_TYPE: &str = "application/json";

const LEGACY_MODEL_MARKERS: [&str; 4] = ["claude-v1", "claude-v2", "claude-instant", "claude-2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Messages API (`content[].text` responses).
    Messages,
    /// Legacy text completion API (`completion` responses).
    TextCompletion,
}

impl ModelFamily {
    pub fn for_model(model_id: &str) -> Self {
        let model_id = model_id.to_ascii_lowercase();
        if LEGACY_MODEL_MARKERS
            .iter()
            .any(|marker| model_id.contains(marker))
        {
            Self::TextCompletion
        } else {
            Self::Messages
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model_id: String,
    pub family: ModelFamily,
    pub body: Vec<u8>,
}

pub fn build_model_request(settings: &ModelSettings, prompt: &str) -> ModelRequest {
    let family = ModelFamily::for_model(&settings.model_id);
    let body = match family {
        ModelFamily::Messages => json!({
            "anthropic_version": ANTHROPIC_VERSION,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "top_p": settings.top_p,
            "system": SYSTEM_INSTRUCTION,
            "messages": [{"role": "user", "content": prompt}],
        }),
        ModelFamily::TextCompletion => json!({
            "prompt": format!("\n\nHuman: {SYSTEM_INSTRUCTION}\n\n{prompt}\n\nAssistant:"),
            "max_tokens_to_sample": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "top_p": settings.top_p,
        }),
    };

    ModelRequest {
        model_id: settings.model_id.clone(),
        family,
        body: body.to_string().into_bytes(),
    }
}

/// Text of a model response and whether generation stopped at the token limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub truncated: bool,
}

const MAX_TOKENS_STOP_REASON: &str = "max_tokens";

pub fn extract_completion_text(family: ModelFamily, body: &[u8]) -> Result<Completion, String> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|error| format!("response body is not JSON: {error}"))?;
    let truncated =
        value.get("stop_reason").and_then(Value::as_str) == Some(MAX_TOKENS_STOP_REASON);

    let text = match family {
        ModelFamily::Messages => {
            let text: Vec<&str> = value
                .get("content")
                .and_then(Value::as_array)
                .map(|blocks| {
                    blocks
                        .iter()
                        .filter(|block| {
                            block.get("type").and_then(Value::as_str).unwrap_or("text") == "text"
                        })
                        .filter_map(|block| block.get("text").and_then(Value::as_str))
                        .collect()
                })
                .unwrap_or_default();
            if text.is_empty() {
                return Err("response has no text content".to_string());
            }
            text.concat()
        }
        ModelFamily::TextCompletion => value
            .get("completion")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "response has no completion field".to_string())?,
    };

    Ok(Completion { text, truncated })
}
