use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use agbench_types::{ScalePoint, Scenario};

use crate::error::Result;

/// Filler exchanges the prefill step cycles through to simulate an
/// existing conversation of the configured length.
fn default_prefill_pool() -> Vec<String> {
    [
        "What's a good spot for lunch around here?",
        "There are a few well-reviewed places within walking distance.",
        "Remind me what we discussed about the quarterly report.",
        "You wanted the revenue table split by region before Friday.",
        "Can you recommend something to read this weekend?",
        "A short history of navigation might suit you, given your notes.",
        "How long does it take to fly to Lisbon?",
        "Around seven hours direct from the east coast.",
        "What did I say my sister's name was?",
        "You mentioned her name is Dana.",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_system_prompt() -> String {
    "You are an autonomous agent operating inside an evaluation environment. \
     Observe the task state, then choose exactly one action per turn from the \
     available action catalog. Be precise with parameters and think step by \
     step before acting."
        .to_string()
}

/// Run configuration: the knobs the matrix, pipeline and runner read.
/// Serializable so a run can be reproduced from its config hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub benchmark_name: String,
    pub model_name: String,
    /// Provider override for model resolution; None = first registered wins.
    pub model_provider: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,

    /// Registry configurations to run (e.g. "basic", "full"). Scenarios
    /// flagged requires_memory / requires_planning only run under "full".
    pub config_names: Vec<String>,
    pub scale_points: Vec<ScalePoint>,
    pub trials: usize,
    pub seed: u64,
    /// Global cap on concurrently running scenarios.
    pub concurrency: usize,

    pub prefill_topic_pool: Vec<String>,
    pub system_prompt: String,

    /// Soft ceiling on composed context size; longest unprotected provider
    /// sections are truncated first.
    pub context_ceiling_chars: usize,

    pub model_call_timeout_ms: u64,
    /// Base backoff between model retries; doubles per attempt.
    pub model_retry_backoff_ms: u64,
    pub action_timeout_ms: u64,
    pub turn_timeout_ms: u64,

    /// Feed ActionResult follow-ups back through compose-state within the
    /// same turn, up to this depth. 0 disables chaining. Clamped to 5.
    pub chain_depth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            benchmark_name: "agbench".to_string(),
            model_name: std::env::var("MODEL_NAME").unwrap_or_else(|_| "mock".to_string()),
            model_provider: None,
            temperature: 0.5,
            max_tokens: 2048,
            config_names: vec!["basic".to_string()],
            scale_points: ScalePoint::default_ladder(),
            trials: 1,
            seed: 42,
            concurrency: 1,
            prefill_topic_pool: default_prefill_pool(),
            system_prompt: default_system_prompt(),
            context_ceiling_chars: 16_000,
            model_call_timeout_ms: 120_000,
            model_retry_backoff_ms: 1_000,
            action_timeout_ms: 30_000,
            turn_timeout_ms: 300_000,
            chain_depth: 0,
        }
    }
}

impl RunConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content).map_err(crate::error::Error::from)?;
        Ok(config)
    }

    /// Effective chain depth, clamped to the pipeline maximum.
    pub fn effective_chain_depth(&self) -> usize {
        self.chain_depth.min(5)
    }

    /// Hard budget for one whole scenario: per-turn budget summed over its
    /// turns, times 1.5.
    pub fn scenario_timeout_ms(&self, scenario: &Scenario) -> u64 {
        let total = self.turn_timeout_ms.saturating_mul(scenario.turns.len() as u64);
        total.saturating_mul(3) / 2
    }

    /// sha256 over the canonical JSON rendering of this configuration.
    pub fn config_hash(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        format!("{:x}", digest)
    }
}
