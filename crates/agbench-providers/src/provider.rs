use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use agbench_types::{ConversationEntry, Observation, ProviderResult};

use crate::error::Result;
use crate::registry::AgentRegistry;

/// Input to one pipeline invocation: the observation plus the conversation
/// it happens inside.
#[derive(Debug, Clone)]
pub struct PipelineMessage {
    pub observation: Observation,
    pub conversation: Vec<ConversationEntry>,

    /// When present, only providers named here run during compose-state.
    pub only_include: Option<Vec<String>>,
}

impl PipelineMessage {
    pub fn new(observation: Observation, conversation: Vec<ConversationEntry>) -> Self {
        Self {
            observation,
            conversation,
            only_include: None,
        }
    }
}

/// One ordered text section of the composed state.
#[derive(Debug, Clone)]
pub struct ComposedSection {
    pub provider: String,
    pub position: i32,
    pub text: String,
}

/// The assembled context handed to the model call and to action handlers.
#[derive(Debug, Clone, Default)]
pub struct ComposedState {
    /// Text sections ordered by provider position ascending.
    pub sections: Vec<ComposedSection>,

    /// Merged provider values, later providers winning on key collision.
    pub values: BTreeMap<String, Value>,

    /// Providers that actually ran, in position order.
    pub providers_run: Vec<String>,
}

impl ComposedState {
    /// Concatenate the ordered sections into the prompt context block.
    pub fn text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A named async producer of context that feeds the model prompt.
///
/// Providers receive the central registry as their first argument (the
/// registry pattern: no back-references), the message being processed, and
/// the base state. Each contributes text ordered by `position`, plus values
/// and data other components can read.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Ordering priority; lower positions render earlier in the prompt.
    fn position(&self) -> i32 {
        0
    }

    /// Dynamic providers are re-run on every compose, never cached.
    fn dynamic(&self) -> bool {
        false
    }

    /// Private providers only run when explicitly requested via
    /// `only_include`.
    fn private(&self) -> bool {
        false
    }

    async fn get(
        &self,
        registry: &AgentRegistry,
        message: &PipelineMessage,
        state: &ComposedState,
    ) -> Result<ProviderResult>;
}
