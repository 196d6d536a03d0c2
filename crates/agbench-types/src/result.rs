use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::scenario::{ExpectedOutcome, ScalePoint};

/// Whether one expected outcome was met, with enough context to debug why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeResult {
    pub outcome: ExpectedOutcome,
    pub passed: bool,

    /// Snippet of what the agent actually produced, for diagnostics.
    pub actual_value: String,

    /// Human-readable explanation of the verdict.
    pub detail: String,
}

/// Result of processing one turn. Mutable while the turn runs, frozen at end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnResult {
    pub turn_index: usize,

    /// Action names the pipeline selected this turn.
    pub selected_actions: Vec<String>,

    pub response_text: String,

    /// Providers the model explicitly asked for.
    #[serde(default)]
    pub providers_requested: Vec<String>,

    /// Providers that actually ran during compose-state.
    #[serde(default)]
    pub providers_consulted: Vec<String>,

    #[serde(default)]
    pub outcome_results: Vec<OutcomeResult>,

    pub latency_ms: u64,

    #[serde(default)]
    pub raw_model_output: String,

    #[serde(default)]
    pub thought: String,
}

impl TurnResult {
    pub fn empty(turn_index: usize) -> Self {
        Self {
            turn_index,
            ..Self::default()
        }
    }
}

/// Result of running one scenario at one scale point under one config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub scenario_name: String,
    pub level: u8,

    #[serde(default)]
    pub category: String,

    pub scale_point: ScalePoint,
    pub config_name: String,
    pub turn_results: Vec<TurnResult>,

    /// Weighted mean over scored turns, in [0, 1].
    pub score: f64,

    pub total_latency_ms: u64,
    pub model_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub trace_id: Uuid,
}

/// One data point on a scaling curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingCurvePoint {
    pub scale_label: String,
    pub action_count: usize,
    pub provider_count: usize,
    pub conversation_prefill: usize,
    pub score: f64,
    pub latency_ms: f64,
    pub scenario_count: usize,
}

/// Aggregate record for one harness invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub benchmark_name: String,
    pub agent_id: String,

    /// sha256 over the canonical JSON of the run configuration.
    pub config_hash: String,

    pub seed: u64,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    pub results: Vec<ScenarioResult>,

    /// Deterministic non-learning scorers, keyed by baseline name.
    #[serde(default)]
    pub baselines: BTreeMap<String, f64>,

    /// Curve per config name, ordered along the scale ladder.
    #[serde(default)]
    pub scaling_curves: BTreeMap<String, Vec<ScalingCurvePoint>>,

    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl RunRecord {
    pub fn new(benchmark_name: impl Into<String>, agent_id: impl Into<String>, seed: u64) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            benchmark_name: benchmark_name.into(),
            agent_id: agent_id.into(),
            config_hash: String::new(),
            seed,
            started_at: Utc::now(),
            completed_at: None,
            results: Vec::new(),
            baselines: BTreeMap::new(),
            scaling_curves: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }
}
