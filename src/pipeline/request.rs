//! Validate stage: find the latest user message in a chat request body.

use serde_json::Value;

use crate::core::errors::ApiError;

pub const MISSING_INPUT: &str = "No message provided";

/// `message` when it is a string, otherwise the `content` of the last
/// element of `messages`. Only an empty string counts as missing.
pub fn extract_latest_message(body: &Value) -> Option<String> {
    let candidate = match body.get("message") {
        Some(Value::String(message)) => Some(message.as_str()),
        _ => body
            .get("messages")
            .and_then(Value::as_array)
            .and_then(|messages| messages.last())
            .and_then(|last| last.get("content"))
            .and_then(Value::as_str),
    };

    candidate
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

pub fn validate(body: &Value) -> Result<String, ApiError> {
    extract_latest_message(body).ok_or_else(|| ApiError::BadRequest(MISSING_INPUT.to_string()))
}
