//! Validating parsers for agent responses
//!
//! Models often wrap JSON in markdown fences or add prose around it. The
//! fences are stripped and the outermost `{...}` block is taken before the
//! shape is checked. Anything that does not match the expected shape is a
//! [`AgentError::MalformedResponse`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::AgentError;
use crate::models::{CommandSuggestion, NarrationDecision};

/// Pre-compiled markdown fence markers
static FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^```json\s*|^```|```$").expect("valid fence regex"));

/// Pre-compiled first-to-last brace span
static OBJECT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid object regex"));

/// Strip markdown fences and return the JSON object inside `text`.
///
/// Returns the cleaned text unchanged when no braces are present.
pub fn extract_json(text: &str) -> String {
    let unfenced = FENCE_REGEX.replace_all(text.trim(), "");
    let unfenced = unfenced.trim();
    match OBJECT_REGEX.find(unfenced) {
        Some(found) => found.as_str().to_string(),
        None => unfenced.to_string(),
    }
}

fn parse_object(text: &str) -> Result<Map<String, Value>, AgentError> {
    let raw = extract_json(text);
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(AgentError::MalformedResponse(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(AgentError::MalformedResponse(e.to_string())),
    }
}

fn string_field(map: &Map<String, Value>, field: &str) -> Result<String, AgentError> {
    match map.get(field) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(other) => Err(AgentError::MalformedResponse(format!(
            "'{}' must be a string, got {}",
            field,
            kind_of(other)
        ))),
        None => Err(AgentError::MalformedResponse(format!(
            "missing '{}' field",
            field
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse `{command, explanation}`
pub fn parse_command_suggestion(text: &str) -> Result<CommandSuggestion, AgentError> {
    let map = parse_object(text)?;
    Ok(CommandSuggestion {
        command: string_field(&map, "command")?,
        explanation: string_field(&map, "explanation")?,
    })
}

/// Parse `{should_update, reason}`
pub fn parse_narration_decision(text: &str) -> Result<NarrationDecision, AgentError> {
    let map = parse_object(text)?;
    let should_update = match map.get("should_update") {
        Some(Value::Bool(flag)) => *flag,
        Some(other) => {
            return Err(AgentError::MalformedResponse(format!(
                "'should_update' must be a boolean, got {}",
                kind_of(other)
            )))
        }
        None => {
            return Err(AgentError::MalformedResponse(
                "missing 'should_update' field".to_string(),
            ))
        }
    };

    Ok(NarrationDecision {
        should_update,
        reason: string_field(&map, "reason")?,
    })
}
