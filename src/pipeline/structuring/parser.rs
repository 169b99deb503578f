use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::types::{CandidateRecord, CandidateWell};
use super::StructuringError;

/// Parse a model response into a candidate record.
///
/// Accepts, in order: the whole response as JSON, the first fenced code
/// block, or the span from the first `{` to the last `}`. The JSON must be
/// an object; individual wells that are not objects are dropped.
pub fn parse_candidate_response(response: &str) -> Result<CandidateRecord, StructuringError> {
    let attempts = [
        Some(response.trim()),
        fenced_json(response),
        outermost_object(response),
    ];

    let mut last_error = String::from("empty response");
    for candidate in attempts.into_iter().flatten() {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => return Ok(candidate_from_object(&map)),
            Ok(other) => last_error = format!("expected a JSON object, got {}", json_kind(&other)),
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(StructuringError::InvalidCandidateFormat(last_error))
}

/// First fenced block, labelled `json` or unlabelled.
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").unwrap());

fn fenced_json(response: &str) -> Option<&str> {
    FENCED_BLOCK
        .captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn outermost_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn candidate_from_object(map: &Map<String, Value>) -> CandidateRecord {
    let wells = match map.get("wells") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(well) => Some(well_from_object(well)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    CandidateRecord {
        operator: text_field(map, &["operator"]),
        entity: text_field(map, &["entity", "owner"]),
        state: text_field(map, &["state"]),
        county: text_field(map, &["county"]),
        effective_date: text_field(map, &["effectiveDate", "effective_date"]),
        notes: text_field(map, &["notes"]),
        wells,
    }
}

fn well_from_object(map: &Map<String, Value>) -> CandidateWell {
    CandidateWell {
        property_name: text_field(map, &["propertyName", "wellName", "property_name", "well_name"]),
        property_description: text_field(map, &["propertyDescription", "property_description"]),
        decimal_interest: text_field(map, &["decimalInterest", "decimal_interest"]),
    }
}

/// First present key wins. Numbers keep their JSON text; blank strings count as absent.
fn text_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}
