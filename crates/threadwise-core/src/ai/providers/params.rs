use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Generation parameters sent with every request to a backend.
///
/// Each backend has its own defaults; clients override individual keys
/// through their `configJson` mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_retries: u32,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl GenerationParams {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Map the spellings clients use onto the field names above
fn canonical_key(key: &str) -> &str {
    match key {
        "maxTokens" | "max_output_tokens" | "maxOutputTokens" => "max_tokens",
        "topP" => "top_p",
        "topK" => "top_k",
        "maxRetries" => "max_retries",
        "timeout" | "timeoutMs" => "timeout_ms",
        other => other,
    }
}

/// Read a client's tuning overrides.
///
/// Accepts an object or a JSON-encoded string. Anything unreadable yields an
/// empty mapping so a broken `configJson` never fails the request.
pub fn parse_overrides(raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) if text.trim().is_empty() => Map::new(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                tracing::warn!(
                    kind = %json_kind(&other),
                    "Tuning parameters are not a JSON object, falling back to defaults"
                );
                Map::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid tuning parameter JSON, falling back to defaults");
                Map::new()
            }
        },
        Some(other) => {
            tracing::warn!(
                kind = %json_kind(other),
                "Tuning parameters are not a JSON object, falling back to defaults"
            );
            Map::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Overlay `overrides` on `defaults`, one key at a time.
///
/// Null values and unknown keys are skipped. A value of the wrong type drops
/// only that key; the rest of the overrides still apply.
pub fn merge_params(defaults: &GenerationParams, overrides: &Map<String, Value>) -> GenerationParams {
    let mut merged = defaults.clone();

    for (key, value) in overrides {
        if value.is_null() {
            continue;
        }

        let field = canonical_key(key);
        let mut candidate = match serde_json::to_value(&merged) {
            Ok(Value::Object(map)) => map,
            _ => break,
        };

        if !candidate.contains_key(field) {
            tracing::debug!(key = %key, "Ignoring unknown tuning parameter");
            continue;
        }

        candidate.insert(field.to_string(), value.clone());
        match serde_json::from_value::<GenerationParams>(Value::Object(candidate)) {
            Ok(params) => merged = params,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring invalid tuning parameter");
            }
        }
    }

    merged
}
