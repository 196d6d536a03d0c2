use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One decision produced by the message pipeline: exactly one action per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDecision {
    /// Symbolic action name, matched case-insensitively against the registry.
    pub action_name: String,

    /// Parameters coerced to the action's declared schema.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,

    /// Executable payload for code-action benchmarks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_code: Option<String>,

    /// Free-text reasoning extracted from the model output.
    #[serde(default)]
    pub reasoning: String,

    /// Model-reported confidence in [0, 1], when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl ActionDecision {
    pub fn named(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            parameters: BTreeMap::new(),
            raw_code: None,
            reasoning: String::new(),
            confidence: None,
        }
    }
}

/// What an action handler produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub values: BTreeMap<String, Value>,

    #[serde(default)]
    pub data: Value,

    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            values: BTreeMap::new(),
            data: Value::Null,
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            values: BTreeMap::new(),
            data: Value::Null,
            success: false,
            error: Some(error.into()),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

/// Context contributed by one provider during compose-state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Text section merged into the prompt, ordered by provider position.
    #[serde(default)]
    pub text: String,

    /// Key/value pairs other providers and handlers can read.
    #[serde(default)]
    pub values: BTreeMap<String, Value>,

    /// Opaque structured payload, not rendered into the prompt.
    #[serde(default)]
    pub data: Value,
}

impl ProviderResult {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}
