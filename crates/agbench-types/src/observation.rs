use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::scenario::TurnActor;

/// The environment's rendered view of its current state, delivered to the
/// agent. Created by the environment driver, consumed by the message
/// pipeline, never mutated after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Task instruction the agent is working toward.
    pub instruction: String,

    pub step_index: usize,
    pub max_steps: usize,

    /// Raw screenshot bytes, for drivers that can render one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Vec<u8>>,

    /// Driver-specific structured state (accessibility tree, chain state, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_state: Option<Value>,

    /// Bounded trailing window of actions already taken.
    #[serde(default)]
    pub previous_actions: Vec<String>,
}

impl Observation {
    pub fn new(instruction: impl Into<String>, step_index: usize, max_steps: usize) -> Self {
        Self {
            instruction: instruction.into(),
            step_index,
            max_steps,
            screenshot: None,
            structured_state: None,
            previous_actions: Vec::new(),
        }
    }
}

/// Outcome of stepping the environment with one action. Total over ordinary
/// agent errors: only infrastructure faults surface as driver errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,

    #[serde(default)]
    pub info: BTreeMap<String, Value>,
}

/// One entry in the conversation store the pipeline composes over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub actor: TurnActor,
    pub text: String,
}

impl ConversationEntry {
    pub fn new(actor: TurnActor, text: impl Into<String>) -> Self {
        Self {
            actor,
            text: text.into(),
        }
    }
}
