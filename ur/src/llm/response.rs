//! Response normalization
//!
//! The serving endpoint does not guarantee one response schema. Known shapes
//! are tried in a fixed order and the first match wins:
//!
//! 1. chat completion: `{"choices": [{"message": {"content": "..."}}]}`
//! 2. raw predictions: `{"predictions": [...]}`
//!
//! Anything else is passed through as text. Normalization never fails.

use serde_json::Value;
use tracing::{debug, warn};

use super::{CompletionResponse, ResponseShape};

/// Normalize a raw 2xx response body
pub fn parse_body(body: &str) -> CompletionResponse {
    match serde_json::from_str::<Value>(body) {
        Ok(payload) => normalize(&payload),
        Err(e) => {
            warn!(error = %e, body_len = body.len(), "parse_body: response is not JSON, passing through");
            CompletionResponse::new(body, ResponseShape::Unrecognized)
        }
    }
}

/// Extract the answer text from a parsed payload
pub fn normalize(payload: &Value) -> CompletionResponse {
    if let Some(content) = chat_completion_content(payload) {
        debug!("normalize: chat completion shape");
        return CompletionResponse::new(content, ResponseShape::ChatCompletion);
    }

    if let Some(prediction) = payload.pointer("/predictions/0") {
        debug!("normalize: predictions shape");
        return CompletionResponse::new(value_text(prediction), ResponseShape::Predictions);
    }

    warn!("normalize: unrecognized response shape, stringifying payload");
    CompletionResponse::new(payload.to_string(), ResponseShape::Unrecognized)
}

fn chat_completion_content(payload: &Value) -> Option<&str> {
    payload.pointer("/choices/0/message/content").and_then(Value::as_str)
}

/// Strings as-is, everything else as compact JSON
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
