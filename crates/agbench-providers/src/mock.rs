use async_trait::async_trait;
use serde_json::{Value, json};

use crate::model::{ModelHandler, ModelRequest};

struct MockRule {
    needle: String,
    response: String,
}

/// Deterministic model handler for offline runs (`--mock`) and tests.
/// Responses are selected by substring match on the prompt, first rule
/// wins; without a match the default response is returned. Seed-free:
/// identical prompts always yield identical output.
pub struct MockModelHandler {
    rules: Vec<MockRule>,
    default_response: String,
}

impl MockModelHandler {
    /// A handler that always answers with a REPLY action.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            default_response: Self::action_json(
                "Nothing specific to do; acknowledging.",
                "REPLY",
                json!({"message": "Understood."}),
            ),
        }
    }

    /// A handler that always returns the given raw text.
    pub fn always(response: impl Into<String>) -> Self {
        Self {
            rules: Vec::new(),
            default_response: response.into(),
        }
    }

    /// A handler that always selects `action` with `parameters`.
    pub fn always_action(action: &str, parameters: Value) -> Self {
        Self::always(Self::action_json(
            &format!("Selecting {}.", action),
            action,
            parameters,
        ))
    }

    /// Add a substring-triggered response, checked before the default.
    pub fn rule(mut self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules.push(MockRule {
            needle: needle.into(),
            response: response.into(),
        });
        self
    }

    /// Render a decision in the pipeline's JSON output grammar.
    pub fn action_json(thought: &str, action: &str, parameters: Value) -> String {
        json!({
            "thought": thought,
            "action": action,
            "parameters": parameters,
        })
        .to_string()
    }
}

impl Default for MockModelHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelHandler for MockModelHandler {
    async fn generate(&self, request: &ModelRequest) -> String {
        for rule in &self.rules {
            if request.prompt.contains(&rule.needle) {
                return rule.response.clone();
            }
        }
        self.default_response.clone()
    }
}
