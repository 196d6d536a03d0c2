use agbench_types::{OutcomeResult, TurnResult};

/// Weighted score for one turn: passing weight over total weight, in
/// [0, 1]. A turn with no assertions always passes.
pub fn compute_turn_score(results: &[OutcomeResult]) -> f64 {
    if results.is_empty() {
        return 1.0;
    }
    let total_weight: f64 = results.iter().map(|r| r.outcome.weight).sum();
    if total_weight <= 0.0 {
        return 1.0;
    }
    let passing_weight: f64 = results
        .iter()
        .filter(|r| r.passed)
        .map(|r| r.outcome.weight)
        .sum();
    passing_weight / total_weight
}

/// Scenario score: arithmetic mean over turns that carry outcomes.
/// Context-setting turns do not contribute; a scenario with no scored
/// turns scores 1.0.
pub fn compute_scenario_score(turn_results: &[TurnResult]) -> f64 {
    let scored: Vec<f64> = turn_results
        .iter()
        .filter(|t| !t.outcome_results.is_empty())
        .map(|t| compute_turn_score(&t.outcome_results))
        .collect();
    if scored.is_empty() {
        return 1.0;
    }
    scored.iter().sum::<f64>() / scored.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbench_types::{ExpectedOutcome, OutcomeKind, OutcomeValue};

    fn result(passed: bool, weight: f64) -> OutcomeResult {
        OutcomeResult {
            outcome: ExpectedOutcome::weighted(
                OutcomeKind::TextContains,
                OutcomeValue::Text("x".into()),
                weight,
            ),
            passed,
            actual_value: String::new(),
            detail: String::new(),
        }
    }

    #[test]
    fn test_empty_outcomes_score_one() {
        assert_eq!(compute_turn_score(&[]), 1.0);
    }

    #[test]
    fn test_weighted_mix() {
        // weight 2 passing + weight 1 failing => 2/3
        let results = vec![result(true, 2.0), result(false, 1.0)];
        let score = compute_turn_score(&results);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_total_weight_scores_one() {
        let results = vec![result(false, 0.0)];
        assert_eq!(compute_turn_score(&results), 1.0);
    }

    #[test]
    fn test_scenario_score_ignores_unscored_turns() {
        let scored = TurnResult {
            outcome_results: vec![result(true, 1.0), result(false, 1.0)],
            ..TurnResult::default()
        };
        let unscored = TurnResult::default();

        let score = compute_scenario_score(&[unscored.clone(), scored, unscored]);
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_with_no_scored_turns() {
        assert_eq!(compute_scenario_score(&[TurnResult::default()]), 1.0);
    }
}
