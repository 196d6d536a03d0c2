use chrono::Utc;
use serde_json::Value;

use agbench_types::{DecisionTrace, StepKind, TraceActor, TraceStep};

/// Per-scenario trace buffer, exclusively owned by its runner task.
/// Appends preserve total timestamp order even under clock skew.
pub struct TraceBuffer {
    trace: DecisionTrace,
    last_ts_ms: i64,
}

impl TraceBuffer {
    pub fn new(scenario_id: impl Into<String>) -> Self {
        Self {
            trace: DecisionTrace::new(scenario_id),
            last_ts_ms: 0,
        }
    }

    pub fn record(&mut self, step_kind: StepKind, actor: TraceActor, latency_ms: u64, payload: Value) {
        let now = Utc::now().timestamp_millis();
        let ts_ms = now.max(self.last_ts_ms);
        self.last_ts_ms = ts_ms;
        self.trace.push(TraceStep {
            ts_ms,
            step_kind,
            actor,
            latency_ms,
            payload,
        });
    }

    pub fn trace(&self) -> &DecisionTrace {
        &self.trace
    }

    pub fn into_trace(self) -> DecisionTrace {
        self.trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_appends_in_order() {
        let mut buffer = TraceBuffer::new("s1");
        buffer.record(StepKind::Observe, TraceActor::Env, 0, json!({"step": 0}));
        buffer.record(StepKind::ModelCall, TraceActor::Agent, 12, json!({}));
        buffer.record(StepKind::Evaluation, TraceActor::Evaluator, 1, json!({}));

        let trace = buffer.into_trace();
        assert_eq!(trace.steps.len(), 3);
        assert!(trace.is_ordered());
        assert_eq!(trace.steps[1].latency_ms, 12);
    }
}
