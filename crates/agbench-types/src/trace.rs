use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a single record in the decision log. Each pipeline stage emits
/// exactly one step of the matching kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Observe,
    ComposeState,
    ModelCall,
    ActionSelected,
    ActionExecuted,
    EnvStep,
    Evaluation,
}

/// Who produced a trace step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceActor {
    Agent,
    Env,
    Evaluator,
}

/// One structured record in the append-only decision log. This is the line
/// format of the persisted trace JSONL; `payload` is self-describing and
/// varies by `step_kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    pub ts_ms: i64,
    pub step_kind: StepKind,
    pub actor: TraceActor,
    pub latency_ms: u64,
    pub payload: Value,
}

/// Append-only decision trace for one scenario run. The primary durable
/// artifact: totally ordered by `ts_ms`, ties broken by insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub trace_id: Uuid,
    pub scenario_id: String,
    pub steps: Vec<TraceStep>,
}

impl DecisionTrace {
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            scenario_id: scenario_id.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step. Steps are recorded in wall-clock order; an
    /// out-of-order timestamp is an internal bug.
    pub fn push(&mut self, step: TraceStep) {
        debug_assert!(
            self.steps.last().map(|prev| prev.ts_ms <= step.ts_ms).unwrap_or(true),
            "trace steps must be appended in timestamp order"
        );
        self.steps.push(step);
    }

    pub fn is_ordered(&self) -> bool {
        self.steps.windows(2).all(|w| w[0].ts_ms <= w[1].ts_ms)
    }

    /// Render the trace as JSONL, one step per line.
    pub fn to_jsonl(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for step in &self.steps {
            out.push_str(&serde_json::to_string(step)?);
            out.push('\n');
        }
        Ok(out)
    }
}
