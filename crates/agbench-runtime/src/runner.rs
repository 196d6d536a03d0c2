use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use agbench_engine::{compute_scenario_score, evaluate_turn};
use agbench_env::EnvironmentDriver;
use agbench_providers::{AgentRegistry, PipelineMessage};
use agbench_types::{
    ConversationEntry, DecisionTrace, OutcomeResult, ScalePoint, Scenario, ScenarioResult,
    StepKind, TraceActor, Turn, TurnActor, TurnResult,
};

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::pipeline::MessagePipeline;
use crate::trace::TraceBuffer;

/// A scenario result together with its decision trace.
#[derive(Debug)]
pub struct ScenarioRun {
    pub result: ScenarioResult,
    pub trace: DecisionTrace,
}

enum TurnFailure {
    Infra(String),
    Cancelled,
}

/// Execute one scenario against one driver instance: prefill, iterate
/// turns through the pipeline and the environment, evaluate outcomes,
/// and tear the environment down whatever happens.
///
/// Driver, model and action faults are contained in the returned result;
/// only configuration and invariant violations propagate.
pub async fn run_scenario(
    registry: &AgentRegistry,
    config: &RunConfig,
    driver: &mut dyn EnvironmentDriver,
    scenario: &Scenario,
    scale_point: ScalePoint,
    config_name: &str,
    cancel: &CancellationToken,
) -> Result<ScenarioRun> {
    let mut trace = TraceBuffer::new(&scenario.id);
    let scenario_started = Instant::now();
    let scenario_budget = Duration::from_millis(config.scenario_timeout_ms(scenario));

    let mut turn_results: Vec<TurnResult> = Vec::new();
    let mut run_error: Option<String> = None;

    if let Err(e) = driver.start(scenario).await {
        error!(scenario = %scenario.id, error = %e, "environment failed to start");
        run_error = Some(format!("environment start failed: {}", e));
    } else {
        let mut conversation = prefill_conversation(config, scale_point);
        let pipeline = MessagePipeline::new(registry, config);

        for (turn_idx, turn) in scenario.turns.iter().enumerate() {
            // Cooperative checks between turns: cancellation first, then
            // the scenario budget.
            if cancel.is_cancelled() {
                run_error = Some("cancelled".to_string());
                break;
            }
            if scenario_started.elapsed() > scenario_budget {
                warn!(scenario = %scenario.id, turn_idx, "scenario timeout");
                run_error = Some("scenario timeout".to_string());
                break;
            }

            if turn.delay_seconds > 0.0 {
                tokio::time::sleep(Duration::from_secs_f64(turn.delay_seconds)).await;
            }

            if turn.new_session {
                match driver.reset(true).await {
                    Ok(_) => trace.record(
                        StepKind::EnvStep,
                        TraceActor::Env,
                        0,
                        json!({"op": "reset", "within_scenario": true}),
                    ),
                    Err(e) => {
                        run_error = Some(format!("environment reset failed: {}", e));
                        turn_results.push(failed_turn(turn, turn_idx, run_error.as_deref().unwrap()));
                        break;
                    }
                }
            }

            // System turns inject context only; the pipeline does not run.
            // Outcomes attached to one are still evaluated, against an
            // empty result.
            if turn.actor == TurnActor::System {
                conversation.push(ConversationEntry::new(TurnActor::System, &turn.text));
                let mut result = TurnResult::empty(turn_idx);
                if turn.is_scored() {
                    result.outcome_results = evaluate_turn(turn, &result, Some(registry));
                }
                turn_results.push(result);
                continue;
            }

            let turn_started = Instant::now();
            let turn_budget = Duration::from_millis(config.turn_timeout_ms);
            let executed = tokio::time::timeout(
                turn_budget,
                execute_turn(
                    &pipeline,
                    driver,
                    turn,
                    turn_idx,
                    &mut conversation,
                    &mut trace,
                    cancel,
                ),
            )
            .await;

            match executed {
                Ok(Ok(mut turn_result)) => {
                    turn_result.latency_ms = turn_started.elapsed().as_millis() as u64;

                    if turn.is_scored() {
                        turn_result.outcome_results =
                            evaluate_turn(turn, &turn_result, Some(registry));
                        let passed =
                            turn_result.outcome_results.iter().filter(|o| o.passed).count();
                        trace.record(
                            StepKind::Evaluation,
                            TraceActor::Evaluator,
                            0,
                            json!({
                                "passed": passed,
                                "total": turn_result.outcome_results.len(),
                            }),
                        );
                    }
                    turn_results.push(turn_result);
                }
                Ok(Err(TurnFailure::Cancelled)) => {
                    run_error = Some("cancelled".to_string());
                    break;
                }
                Ok(Err(TurnFailure::Infra(msg))) => {
                    error!(scenario = %scenario.id, turn_idx, error = %msg, "turn failed");
                    run_error = Some(format!("turn {} failed: {}", turn_idx, msg));
                    turn_results.push(failed_turn(turn, turn_idx, &msg));
                    break;
                }
                Err(_) => {
                    warn!(scenario = %scenario.id, turn_idx, "turn timeout");
                    run_error = Some(format!("turn {} timeout", turn_idx));
                    turn_results.push(failed_turn(turn, turn_idx, "turn timed out"));
                    break;
                }
            }
        }
    }

    // Teardown runs on every exit path, cancellation included.
    if let Err(e) = driver.teardown().await {
        warn!(scenario = %scenario.id, error = %e, "teardown failed");
    }

    let score = compute_scenario_score(&turn_results);
    let total_latency_ms = scenario_started.elapsed().as_millis() as u64;
    let trace = trace.into_trace();

    info!(
        scenario = %scenario.id,
        score = %format!("{:.1}%", score * 100.0),
        turns = turn_results.len(),
        "scenario complete"
    );

    Ok(ScenarioRun {
        result: ScenarioResult {
            scenario_id: scenario.id.clone(),
            scenario_name: scenario.name.clone(),
            level: scenario.level,
            category: scenario.category.clone(),
            scale_point,
            config_name: config_name.to_string(),
            turn_results,
            score,
            total_latency_ms,
            model_name: config.model_name.clone(),
            error: run_error,
            trace_id: trace.trace_id,
        },
        trace,
    })
}

/// One non-system turn: observe, run the pipeline, step the environment.
async fn execute_turn(
    pipeline: &MessagePipeline<'_>,
    driver: &mut dyn EnvironmentDriver,
    turn: &Turn,
    turn_idx: usize,
    conversation: &mut Vec<ConversationEntry>,
    trace: &mut TraceBuffer,
    cancel: &CancellationToken,
) -> std::result::Result<TurnResult, TurnFailure> {
    let observation = driver
        .observe()
        .await
        .map_err(|e| TurnFailure::Infra(e.to_string()))?;
    trace.record(
        StepKind::Observe,
        TraceActor::Env,
        0,
        json!({
            "step_index": observation.step_index,
            "instruction": observation.instruction,
        }),
    );

    conversation.push(ConversationEntry::new(TurnActor::User, &turn.text));
    let message = PipelineMessage::new(observation, conversation.clone());

    let output = match pipeline.handle_message(&message, trace, cancel).await {
        Ok(output) => output,
        Err(Error::Cancelled) => return Err(TurnFailure::Cancelled),
        Err(e) => return Err(TurnFailure::Infra(e.to_string())),
    };

    // Cancellation is re-checked before touching the environment.
    if cancel.is_cancelled() {
        return Err(TurnFailure::Cancelled);
    }

    let step_started = Instant::now();
    let step = driver
        .step(&output.decision)
        .await
        .map_err(|e| TurnFailure::Infra(e.to_string()))?;
    trace.record(
        StepKind::EnvStep,
        TraceActor::Env,
        step_started.elapsed().as_millis() as u64,
        json!({
            "op": "step",
            "action": output.decision.action_name,
            "reward": step.reward,
            "done": step.done,
        }),
    );

    conversation.push(ConversationEntry::new(
        TurnActor::Assistant,
        &output.response_text,
    ));

    Ok(TurnResult {
        turn_index: turn_idx,
        selected_actions: vec![output.decision.action_name.clone()],
        response_text: output.response_text,
        providers_requested: output.providers_requested,
        providers_consulted: output.providers_consulted,
        outcome_results: Vec::new(),
        latency_ms: 0,
        raw_model_output: output.raw_model_output,
        thought: output.thought,
    })
}

/// A turn that never completed: every outcome fails with the reason.
fn failed_turn(turn: &Turn, turn_idx: usize, reason: &str) -> TurnResult {
    let mut result = TurnResult::empty(turn_idx);
    result.outcome_results = turn
        .all_outcomes()
        .into_iter()
        .map(|outcome| OutcomeResult {
            outcome,
            passed: false,
            actual_value: String::new(),
            detail: format!("Turn failed: {}", reason),
        })
        .collect();
    result
}

/// Alternate user/assistant filler drawn cyclically from the topic pool.
/// Prefill never triggers the pipeline.
fn prefill_conversation(config: &RunConfig, scale_point: ScalePoint) -> Vec<ConversationEntry> {
    let pool = &config.prefill_topic_pool;
    if pool.is_empty() {
        return Vec::new();
    }
    (0..scale_point.conversation_prefill)
        .map(|i| {
            let actor = if i % 2 == 0 {
                TurnActor::User
            } else {
                TurnActor::Assistant
            };
            ConversationEntry::new(actor, pool[i % pool.len()].clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefill_alternates_and_cycles() {
        let config = RunConfig {
            prefill_topic_pool: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..RunConfig::default()
        };
        let entries = prefill_conversation(&config, ScalePoint::new(10, 8, 5));
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].actor, TurnActor::User);
        assert_eq!(entries[1].actor, TurnActor::Assistant);
        assert_eq!(entries[3].text, "a");
    }

    #[test]
    fn test_failed_turn_fails_every_outcome() {
        use agbench_types::{ExpectedOutcome, OutcomeKind, OutcomeValue};
        let turn = Turn::user("go")
            .with_outcomes(vec![ExpectedOutcome::new(
                OutcomeKind::ActionMatch,
                OutcomeValue::Text("A".into()),
            )])
            .with_forbidden(vec![ExpectedOutcome::new(
                OutcomeKind::ActionNotMatch,
                OutcomeValue::Text("B".into()),
            )]);

        let result = failed_turn(&turn, 2, "boom");
        assert_eq!(result.turn_index, 2);
        assert_eq!(result.outcome_results.len(), 2);
        assert!(result.outcome_results.iter().all(|o| !o.passed));
        assert!(result.outcome_results[0].detail.contains("boom"));
    }
}
