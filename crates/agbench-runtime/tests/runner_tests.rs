use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use agbench_env::InMemoryDriver;
use agbench_providers::{MockModelHandler, ModelHandler, ModelRequest};
use agbench_runtime::{Harness, RunConfig, run_scenario};
use agbench_testing::fixtures;
use agbench_testing::{DriverCall, FlakyDriver, RecordingDriver, ScriptedModelHandler, SlowModelHandler};
use agbench_types::{ScalePoint, Scenario, StepKind};

fn scale() -> ScalePoint {
    ScalePoint::new(10, 8, 0)
}

async fn run_one(
    model: Arc<dyn ModelHandler>,
    config: RunConfig,
    scenario: &Scenario,
) -> agbench_runtime::ScenarioRun {
    let harness = Harness::new(config.clone(), model, "mock");
    let registry = harness.build_registry(scale()).unwrap();
    let mut driver = InMemoryDriver::new(50);
    run_scenario(
        &registry,
        &config,
        &mut driver,
        scenario,
        scale(),
        "basic",
        &CancellationToken::new(),
    )
    .await
    .expect("scenario runs")
}

#[tokio::test]
async fn test_single_turn_action_match_pass() {
    let model = Arc::new(MockModelHandler::always_action(
        "CLICK",
        json!({"x": 100, "y": 200}),
    ));
    let run = run_one(model, RunConfig::default(), &fixtures::click_scenario()).await;

    assert_eq!(run.result.score, 1.0);
    assert_eq!(run.result.turn_results.len(), 1);
    assert_eq!(run.result.turn_results[0].selected_actions, vec!["CLICK"]);
    assert!(run.result.turn_results[0].outcome_results[0].passed);
    assert!(run.result.error.is_none());
}

#[tokio::test]
async fn test_action_not_match_violation_scores_zero() {
    let model = Arc::new(MockModelHandler::always_action(
        "CLICK",
        json!({"x": 100, "y": 200}),
    ));
    let run = run_one(model, RunConfig::default(), &fixtures::forbidden_click_scenario()).await;

    assert_eq!(run.result.score, 0.0);
    let outcome = &run.result.turn_results[0].outcome_results[0];
    assert!(!outcome.passed);
    assert!(outcome.detail.contains("Violations: CLICK"));
}

#[tokio::test]
async fn test_weighted_mixed_outcomes() {
    // Action matches (weight 2); "hello" is absent from the WAIT response
    // text (weight 1): turn score 2/3.
    let model = Arc::new(MockModelHandler::always_action("WAIT", json!({})));
    let run = run_one(model, RunConfig::default(), &fixtures::weighted_scenario()).await;

    assert!((run.result.score - 2.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_new_session_resets_environment_exactly_once() {
    let model = Arc::new(ScriptedModelHandler::new(
        vec![
            MockModelHandler::action_json(
                "note it",
                "REPLY",
                json!({"message": "Saved: your badge code is 4417."}),
            ),
            MockModelHandler::action_json(
                "recall it",
                "REPLY",
                json!({"message": "Your badge code is 4417."}),
            ),
        ],
        "",
    ));

    let config = RunConfig::default();
    let harness = Harness::new(config.clone(), model, "mock");
    let registry = harness.build_registry(scale()).unwrap();
    let (mut driver, calls) = RecordingDriver::new();

    let run = run_scenario(
        &registry,
        &config,
        &mut driver,
        &fixtures::new_session_scenario(),
        scale(),
        "basic",
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.result.score, 1.0);

    let calls = calls.lock().unwrap().clone();
    let resets: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, DriverCall::Reset { within_scenario: true }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(resets.len(), 1, "exactly one within-scenario reset");

    // The reset sits between turn 1's step and turn 2's step.
    let step_positions: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| matches!(c, DriverCall::Step { .. }))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(step_positions.len(), 2);
    assert!(step_positions[0] < resets[0]);
    assert!(resets[0] < step_positions[1]);

    assert_eq!(calls.last(), Some(&DriverCall::Teardown));
}

#[tokio::test]
async fn test_model_timeout_retries_then_safe_default() {
    // Sleeps past the call timeout twice, then answers "" immediately.
    let slow = Arc::new(SlowModelHandler::new(
        vec![Duration::from_secs(5), Duration::from_secs(5)],
        "",
    ));
    let config = RunConfig {
        model_call_timeout_ms: 50,
        model_retry_backoff_ms: 10,
        ..RunConfig::default()
    };

    let run = run_one(slow.clone(), config, &fixtures::click_scenario()).await;

    assert_eq!(slow.calls(), 3, "retried three times");
    assert_eq!(run.result.turn_results[0].selected_actions, vec!["WAIT"]);
    let outcome = &run.result.turn_results[0].outcome_results[0];
    assert!(!outcome.passed);
    assert!(outcome.detail.contains(r#"Expected one of ["CLICK"], got ["WAIT"]"#));
}

/// Succeeds on a fixed share of the suite, shrinking as the catalog grows:
/// 9/10 at 10 actions, 7/10 at 25, 5/10 at 50.
struct CatalogSensitiveModel;

#[async_trait]
impl ModelHandler for CatalogSensitiveModel {
    async fn generate(&self, request: &ModelRequest) -> String {
        let catalog_size = request
            .prompt
            .lines()
            .find_map(|line| line.strip_prefix("Available actions: "))
            .map(|names| names.split(',').count())
            .unwrap_or(0);

        let target: usize = request
            .prompt
            .split("click target number ")
            .nth(1)
            .and_then(|rest| {
                rest.chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse()
                    .ok()
            })
            .unwrap_or(0);

        let successes = if catalog_size <= 10 {
            9
        } else if catalog_size <= 25 {
            7
        } else {
            5
        };

        if target < successes {
            MockModelHandler::action_json("clicking", "CLICK", json!({"x": 1, "y": 1}))
        } else {
            MockModelHandler::action_json("unsure", "WAIT", json!({}))
        }
    }
}

#[tokio::test]
async fn test_scaling_curve_shape() {
    let config = RunConfig {
        scale_points: vec![
            ScalePoint::new(10, 8, 0),
            ScalePoint::new(25, 12, 10),
            ScalePoint::new(50, 18, 30),
        ],
        ..RunConfig::default()
    };
    let harness = Harness::new(config, Arc::new(CatalogSensitiveModel), "mock");
    let scenarios = fixtures::click_suite(10);

    let (record, traces) = harness
        .run(
            &scenarios,
            Arc::new(|| Box::new(InMemoryDriver::new(50)) as Box<dyn agbench_env::EnvironmentDriver>),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(record.results.len(), 30);
    assert_eq!(traces.len(), 30);

    let curve = &record.scaling_curves["basic"];
    assert_eq!(curve.len(), 3);
    assert!(curve.iter().all(|p| p.scenario_count == 10));
    assert!(curve[0].score > curve[1].score);
    assert!(curve[1].score > curve[2].score);
    assert!((curve[0].score - 0.9).abs() < 1e-9);
    assert!((curve[2].score - 0.5).abs() < 1e-9);

    assert!(record.baselines.contains_key("random"));
    assert!(record.baselines.contains_key("always_reply"));
}

/// Trips the cancel token once its first step completes, so cancellation
/// lands between turn 1 and turn 2.
struct CancellingDriver {
    inner: InMemoryDriver,
    cancel: CancellationToken,
}

#[async_trait]
impl agbench_env::EnvironmentDriver for CancellingDriver {
    fn name(&self) -> &str {
        "cancelling"
    }

    async fn start(&mut self, scenario: &Scenario) -> agbench_env::Result<()> {
        self.inner.start(scenario).await
    }

    async fn observe(&mut self) -> agbench_env::Result<agbench_types::Observation> {
        self.inner.observe().await
    }

    async fn step(
        &mut self,
        action: &agbench_types::ActionDecision,
    ) -> agbench_env::Result<agbench_types::StepResult> {
        let result = self.inner.step(action).await;
        self.cancel.cancel();
        result
    }

    async fn reset(&mut self, within_scenario: bool) -> agbench_env::Result<agbench_types::Observation> {
        self.inner.reset(within_scenario).await
    }

    async fn teardown(&mut self) -> agbench_env::Result<()> {
        self.inner.teardown().await
    }
}

#[tokio::test]
async fn test_cancellation_between_turns_yields_partial_result() {
    let cancel = CancellationToken::new();
    let model = Arc::new(MockModelHandler::always_action(
        "REPLY",
        json!({"message": "done"}),
    ));
    let config = RunConfig::default();
    let harness = Harness::new(config.clone(), model, "mock");
    let registry = harness.build_registry(scale()).unwrap();

    // Two user turns; only the first should complete.
    let mut scenario = fixtures::new_session_scenario();
    scenario.turns[1].new_session = false;

    let mut driver = CancellingDriver {
        inner: InMemoryDriver::new(50),
        cancel: cancel.clone(),
    };
    let run = run_scenario(
        &registry,
        &config,
        &mut driver,
        &scenario,
        scale(),
        "basic",
        &cancel,
    )
    .await
    .unwrap();

    assert_eq!(run.result.turn_results.len(), 1);
    assert_eq!(run.result.error.as_deref(), Some("cancelled"));
}

#[tokio::test]
async fn test_driver_step_failure_marks_scenario_errored() {
    let model = Arc::new(MockModelHandler::always_action(
        "CLICK",
        json!({"x": 1, "y": 1}),
    ));
    let config = RunConfig::default();
    let harness = Harness::new(config.clone(), model, "mock");
    let registry = harness.build_registry(scale()).unwrap();

    let mut driver = FlakyDriver::failing_step_at(0);
    let run = run_scenario(
        &registry,
        &config,
        &mut driver,
        &fixtures::click_scenario(),
        scale(),
        "basic",
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(run.result.error.as_deref().unwrap().contains("failed"));
    assert_eq!(run.result.turn_results.len(), 1);
    let outcomes = &run.result.turn_results[0].outcome_results;
    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().all(|o| !o.passed));
    assert_eq!(run.result.score, 0.0);
}

#[tokio::test]
async fn test_driver_start_failure_produces_errored_result() {
    let model = Arc::new(MockModelHandler::new());
    let config = RunConfig::default();
    let harness = Harness::new(config.clone(), model, "mock");
    let registry = harness.build_registry(scale()).unwrap();

    let mut driver = FlakyDriver::failing_start();
    let run = run_scenario(
        &registry,
        &config,
        &mut driver,
        &fixtures::click_scenario(),
        scale(),
        "basic",
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert!(run.result.error.as_deref().unwrap().contains("start failed"));
    assert!(run.result.turn_results.is_empty());
}

#[tokio::test]
async fn test_trace_is_totally_ordered_and_complete() {
    let model = Arc::new(MockModelHandler::always_action(
        "CLICK",
        json!({"x": 1, "y": 1}),
    ));
    let run = run_one(model, RunConfig::default(), &fixtures::click_scenario()).await;

    assert!(run.trace.is_ordered());
    let kinds: Vec<StepKind> = run.trace.steps.iter().map(|s| s.step_kind).collect();
    for expected in [
        StepKind::Observe,
        StepKind::ComposeState,
        StepKind::ModelCall,
        StepKind::ActionSelected,
        StepKind::ActionExecuted,
        StepKind::EnvStep,
        StepKind::Evaluation,
    ] {
        assert!(kinds.contains(&expected), "missing {:?}", expected);
    }

    // Every executed action has a selection before it.
    let selected_idx = kinds.iter().position(|k| *k == StepKind::ActionSelected);
    let executed_idx = kinds.iter().position(|k| *k == StepKind::ActionExecuted);
    assert!(selected_idx.unwrap() < executed_idx.unwrap());
}

#[tokio::test]
async fn test_capability_mismatch_skips_scenario() {
    let mut scenario = fixtures::click_scenario();
    scenario.required_capabilities = vec!["screenshot".to_string()];

    let harness = Harness::new(RunConfig::default(), Arc::new(MockModelHandler::new()), "mock");
    let (record, traces) = harness
        .run(
            &[scenario],
            Arc::new(|| Box::new(InMemoryDriver::new(50)) as Box<dyn agbench_env::EnvironmentDriver>),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(record.results.is_empty());
    assert!(traces.is_empty());
}

#[tokio::test]
async fn test_system_turns_bypass_pipeline() {
    let model = Arc::new(ScriptedModelHandler::new(
        vec![MockModelHandler::action_json(
            "answer",
            "REPLY",
            json!({"message": "The launch code phrase is peregrine."}),
        )],
        "",
    ));

    let mut scenario = fixtures::click_scenario();
    scenario.turns = vec![
        agbench_types::Turn::system("Background: the launch code phrase is peregrine."),
        agbench_types::Turn::user("what is the launch code phrase?").with_outcomes(vec![
            agbench_types::ExpectedOutcome::new(
                agbench_types::OutcomeKind::TextContains,
                agbench_types::OutcomeValue::Text("peregrine".into()),
            ),
        ]),
    ];

    let config = RunConfig::default();
    let harness = Harness::new(config.clone(), model.clone(), "mock");
    let registry = harness.build_registry(scale()).unwrap();
    let mut driver = InMemoryDriver::new(50);

    let run = run_scenario(
        &registry,
        &config,
        &mut driver,
        &scenario,
        scale(),
        "basic",
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    // One model call: the system turn injected context without the pipeline.
    assert_eq!(model.calls(), 1);
    assert_eq!(run.result.turn_results.len(), 2);
    assert!(run.result.turn_results[0].outcome_results.is_empty());
    assert_eq!(run.result.score, 1.0);

    // The injected context reached the model through the history provider.
    assert!(model.prompts()[0].contains("peregrine"));
}

#[tokio::test]
async fn test_rerun_with_same_seed_is_deterministic() {
    let config = RunConfig {
        scale_points: vec![ScalePoint::new(10, 8, 0)],
        ..RunConfig::default()
    };
    let scenarios = fixtures::sample_scenarios();

    let mut summaries = Vec::new();
    for _ in 0..2 {
        let harness = Harness::new(
            config.clone(),
            Arc::new(MockModelHandler::always_action("CLICK", json!({"x": 1, "y": 1}))),
            "mock",
        );
        let (record, _) = harness
            .run(
                &scenarios,
                Arc::new(|| Box::new(InMemoryDriver::new(50)) as Box<dyn agbench_env::EnvironmentDriver>),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let mut summary = agbench_engine::build_summary(&record);
        // Wall-clock measurements are not part of the output contract.
        summary.metadata.remove("duration_ms");
        for point in summary.scaling_curves.values_mut().flatten() {
            point.latency_ms = 0.0;
        }
        for per in summary.per_scenario.values_mut() {
            per.latency_ms = 0.0;
        }
        summaries.push(serde_json::to_string_pretty(&summary).unwrap());
    }

    assert_eq!(summaries[0], summaries[1]);
}
