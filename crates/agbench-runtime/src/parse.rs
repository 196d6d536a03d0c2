use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Structured fields recovered from a raw model response. `action` is None
/// when the output is freeform prose.
#[derive(Debug, Clone, Default)]
pub struct ParsedOutput {
    pub thought: String,
    pub action: Option<String>,
    pub parameters: BTreeMap<String, Value>,
    pub providers: Vec<String>,
    /// The freeform remainder (full raw text when no structure was found).
    pub text: String,
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced json regex"));
static XML_THOUGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<thought>(.*?)</thought>").expect("thought regex"));
static XML_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<action>(.*?)</action>").expect("action regex"));
static XML_PARAMETERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<parameters>(.*?)</parameters>").expect("parameters regex"));

/// Recover a decision from a model response. The grammar accepts, in order
/// of preference: a fenced JSON object, a bare JSON object, an XML block
/// with thought/action/parameters tags, and finally freeform prose.
pub fn parse_model_output(raw: &str) -> ParsedOutput {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedOutput::default();
    }

    if let Some(captures) = FENCED_JSON.captures(trimmed)
        && let Some(parsed) = parse_json_object(&captures[1])
    {
        return parsed;
    }

    if let Some(candidate) = bare_json_candidate(trimmed)
        && let Some(parsed) = parse_json_object(candidate)
    {
        return parsed;
    }

    if let Some(parsed) = parse_xml_block(trimmed) {
        return parsed;
    }

    ParsedOutput {
        text: trimmed.to_string(),
        ..ParsedOutput::default()
    }
}

fn bare_json_candidate(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

fn parse_json_object(candidate: &str) -> Option<ParsedOutput> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;

    let action = object
        .get("action")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    // An object without an action field is not a decision.
    action.as_ref()?;

    let parameters = object
        .get("parameters")
        .and_then(|v| v.as_object())
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    let providers = object
        .get("providers")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(ParsedOutput {
        thought: object
            .get("thought")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        action,
        parameters,
        providers,
        text: object
            .get("text")
            .or_else(|| object.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

fn parse_xml_block(raw: &str) -> Option<ParsedOutput> {
    let action = XML_ACTION
        .captures(raw)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())?;

    let thought = XML_THOUGHT
        .captures(raw)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    let parameters = XML_PARAMETERS
        .captures(raw)
        .and_then(|c| serde_json::from_str::<Value>(c[1].trim()).ok())
        .and_then(|v| {
            v.as_object()
                .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        })
        .unwrap_or_default();

    Some(ParsedOutput {
        thought,
        action: Some(action),
        parameters,
        providers: Vec::new(),
        text: String::new(),
    })
}
