use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use agbench_types::{Scenario, TurnResult};

use crate::evaluator::evaluate_turn;
use crate::score::{compute_scenario_score, compute_turn_score};

/// Score a synthetic policy that selects one action per scored turn.
/// Baselines go through the real evaluator so they are scored identically
/// to live runs.
fn baseline_score(scenarios: &[Scenario], mut pick: impl FnMut() -> String) -> f64 {
    if scenarios.is_empty() {
        return 0.0;
    }

    let mut scenario_scores = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let mut turn_scores = Vec::new();
        for turn in &scenario.turns {
            if !turn.is_scored() {
                continue;
            }
            let result = TurnResult {
                selected_actions: vec![pick()],
                ..TurnResult::default()
            };
            let outcomes = evaluate_turn(turn, &result, None);
            turn_scores.push(compute_turn_score(&outcomes));
        }

        let score = if turn_scores.is_empty() {
            // No assertions anywhere: fall back to the shared convention.
            compute_scenario_score(&[])
        } else {
            turn_scores.iter().sum::<f64>() / turn_scores.len() as f64
        };
        scenario_scores.push(score);
    }

    scenario_scores.iter().sum::<f64>() / scenario_scores.len() as f64
}

/// A policy that picks a uniformly random action from the registered
/// catalog each scored turn. Deterministic for a given seed.
pub fn random_baseline(scenarios: &[Scenario], action_pool: &[String], seed: u64) -> f64 {
    if action_pool.is_empty() {
        return 0.0;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    baseline_score(scenarios, || {
        action_pool[rng.random_range(0..action_pool.len())].clone()
    })
}

/// A policy that only ever replies.
pub fn always_reply_baseline(scenarios: &[Scenario]) -> f64 {
    baseline_score(scenarios, || "REPLY".to_string())
}
