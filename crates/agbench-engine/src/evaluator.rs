use agbench_providers::AgentRegistry;
use agbench_types::{
    ExpectedOutcome, OutcomeKind, OutcomeResult, Turn, TurnResult, find_normalized, normalize,
    normalized_len, snippet_around, truncate,
};

/// Evaluate every outcome of a turn (expected first, then forbidden)
/// against what the turn produced. Pure: calling twice yields identical
/// results. The registry is only consulted for CUSTOM predicates.
pub fn evaluate_turn(
    turn: &Turn,
    result: &TurnResult,
    registry: Option<&AgentRegistry>,
) -> Vec<OutcomeResult> {
    turn.all_outcomes()
        .iter()
        .map(|outcome| evaluate_outcome(outcome, result, registry))
        .collect()
}

/// Evaluate a single expected outcome against a turn result. Unknown or
/// malformed outcomes become failed results with an explanatory detail;
/// evaluation never halts a run.
pub fn evaluate_outcome(
    outcome: &ExpectedOutcome,
    turn: &TurnResult,
    registry: Option<&AgentRegistry>,
) -> OutcomeResult {
    match outcome.kind {
        OutcomeKind::ActionMatch => eval_action_match(outcome, turn),
        OutcomeKind::ActionNotMatch => eval_action_not_match(outcome, turn),
        OutcomeKind::TextContains | OutcomeKind::MemoryRecalled => {
            eval_text_contains(outcome, turn)
        }
        OutcomeKind::TextNotContains => eval_text_not_contains(outcome, turn),
        OutcomeKind::ParamMatch => eval_param_match(outcome, turn),
        OutcomeKind::ProvidersRequested => eval_providers_requested(outcome, turn),
        OutcomeKind::Custom => eval_custom(outcome, turn, registry),
    }
}

fn failed(outcome: &ExpectedOutcome, actual: impl Into<String>, detail: impl Into<String>) -> OutcomeResult {
    OutcomeResult {
        outcome: outcome.clone(),
        passed: false,
        actual_value: actual.into(),
        detail: detail.into(),
    }
}

fn eval_action_match(outcome: &ExpectedOutcome, turn: &TurnResult) -> OutcomeResult {
    let Some(expected) = outcome.value.as_list() else {
        return failed(
            outcome,
            outcome.value.to_string(),
            "Invalid value type for action_match: expected string or list",
        );
    };

    let expected: Vec<String> = expected.iter().map(|a| a.to_uppercase()).collect();
    let selected: Vec<String> = turn.selected_actions.iter().map(|a| a.to_uppercase()).collect();
    let matched: Vec<&String> = expected.iter().filter(|a| selected.contains(a)).collect();
    let passed = !matched.is_empty();

    let matched_note = if passed {
        format!(
            "Matched: {}",
            matched.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",")
        )
    } else {
        "No match".to_string()
    };

    OutcomeResult {
        outcome: outcome.clone(),
        passed,
        actual_value: turn.selected_actions.join(","),
        detail: format!("Expected one of {:?}, got {:?}. {}", expected, selected, matched_note),
    }
}

fn eval_action_not_match(outcome: &ExpectedOutcome, turn: &TurnResult) -> OutcomeResult {
    let Some(forbidden) = outcome.value.as_list() else {
        return failed(
            outcome,
            outcome.value.to_string(),
            "Invalid value type for action_not_match: expected string or list",
        );
    };

    let forbidden: Vec<String> = forbidden.iter().map(|a| a.to_uppercase()).collect();
    let selected: Vec<String> = turn.selected_actions.iter().map(|a| a.to_uppercase()).collect();
    let violations: Vec<&String> = forbidden.iter().filter(|a| selected.contains(a)).collect();
    let passed = violations.is_empty();

    let violation_note = if passed {
        "No violations".to_string()
    } else {
        format!(
            "Violations: {}",
            violations.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",")
        )
    };

    OutcomeResult {
        outcome: outcome.clone(),
        passed,
        actual_value: turn.selected_actions.join(","),
        detail: format!("Forbidden actions {:?}. {}", forbidden, violation_note),
    }
}

fn eval_text_contains(outcome: &ExpectedOutcome, turn: &TurnResult) -> OutcomeResult {
    let Some(needle) = outcome.value.as_text() else {
        return failed(
            outcome,
            "",
            format!(
                "Invalid value type for {}: expected string",
                outcome.kind.as_str()
            ),
        );
    };

    let haystack = normalize(&turn.response_text);
    match find_normalized(&turn.response_text, needle) {
        Some(idx) => {
            let snippet = snippet_around(&haystack, idx, normalized_len(needle));
            OutcomeResult {
                outcome: outcome.clone(),
                passed: true,
                actual_value: snippet.clone(),
                detail: format!("Found '{}' in response: '...{}...'", needle, snippet),
            }
        }
        None => {
            let snippet = truncate(&turn.response_text, 200);
            OutcomeResult {
                outcome: outcome.clone(),
                passed: false,
                actual_value: snippet.clone(),
                detail: format!("'{}' not found in response: '{}'", needle, snippet),
            }
        }
    }
}

fn eval_text_not_contains(outcome: &ExpectedOutcome, turn: &TurnResult) -> OutcomeResult {
    let Some(needle) = outcome.value.as_text() else {
        return failed(
            outcome,
            "",
            "Invalid value type for text_not_contains: expected string",
        );
    };

    match find_normalized(&turn.response_text, needle) {
        Some(idx) => {
            let haystack = normalize(&turn.response_text);
            let snippet = snippet_around(&haystack, idx, normalized_len(needle));
            OutcomeResult {
                outcome: outcome.clone(),
                passed: false,
                actual_value: truncate(&turn.response_text, 100),
                detail: format!("Unexpectedly found '{}' in response: '...{}...'", needle, snippet),
            }
        }
        None => OutcomeResult {
            outcome: outcome.clone(),
            passed: true,
            actual_value: truncate(&turn.response_text, 100),
            detail: format!("Correctly absent: '{}' not in response", needle),
        },
    }
}

fn eval_param_match(outcome: &ExpectedOutcome, turn: &TurnResult) -> OutcomeResult {
    let Some(expected) = outcome.value.as_map() else {
        return failed(
            outcome,
            "",
            "Invalid value type for param_match: expected map",
        );
    };

    let combined = format!(
        "{} {} {}",
        turn.response_text, turn.thought, turn.raw_model_output
    );

    let mut found = Vec::new();
    let mut missing = Vec::new();
    for (key, value) in expected {
        if find_normalized(&combined, value).is_some() {
            found.push(format!("{}={}", key, value));
        } else {
            missing.push(format!("{}={}", key, value));
        }
    }
    let passed = missing.is_empty();

    OutcomeResult {
        outcome: outcome.clone(),
        passed,
        actual_value: format!("found={:?}, missing={:?}", found, missing),
        detail: format!("Param check: found {:?}, missing {:?}", found, missing),
    }
}

fn eval_providers_requested(outcome: &ExpectedOutcome, turn: &TurnResult) -> OutcomeResult {
    let Some(expected) = outcome.value.as_list() else {
        return failed(
            outcome,
            "",
            "Invalid value type for providers_requested: expected string or list",
        );
    };

    let expected: Vec<String> = expected.iter().map(|p| p.to_uppercase()).collect();
    let requested: Vec<String> = turn.providers_requested.iter().map(|p| p.to_uppercase()).collect();
    let consulted: Vec<String> = turn.providers_consulted.iter().map(|p| p.to_uppercase()).collect();

    let missing: Vec<&String> = expected
        .iter()
        .filter(|p| !requested.contains(p) && !consulted.contains(p))
        .collect();
    let passed = missing.is_empty();

    let mut all: Vec<String> = requested.iter().chain(consulted.iter()).cloned().collect();
    all.sort();
    all.dedup();

    let missing_note = if passed {
        "All matched".to_string()
    } else {
        format!(
            "Missing: {}",
            missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",")
        )
    };

    OutcomeResult {
        outcome: outcome.clone(),
        passed,
        actual_value: all.join(","),
        detail: format!(
            "Expected providers {:?}. Requested: {:?}. Actually run: {:?}. {}",
            expected, requested, consulted, missing_note
        ),
    }
}

fn eval_custom(
    outcome: &ExpectedOutcome,
    turn: &TurnResult,
    registry: Option<&AgentRegistry>,
) -> OutcomeResult {
    let Some(id) = outcome.value.as_text() else {
        return failed(outcome, "", "Invalid value type for custom: expected predicate id");
    };

    match registry.and_then(|r| r.predicate(id)) {
        Some(predicate) => {
            let passed = predicate.as_ref()(turn);
            OutcomeResult {
                outcome: outcome.clone(),
                passed,
                actual_value: String::new(),
                detail: format!(
                    "Custom predicate '{}' {}",
                    id,
                    if passed { "passed" } else { "failed" }
                ),
            }
        }
        None => failed(outcome, "", format!("unknown custom predicate '{}'", id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbench_types::{OutcomeValue, Turn};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn turn_result(actions: &[&str], response: &str) -> TurnResult {
        TurnResult {
            turn_index: 0,
            selected_actions: actions.iter().map(|a| a.to_string()).collect(),
            response_text: response.to_string(),
            ..TurnResult::default()
        }
    }

    fn outcome(kind: OutcomeKind, value: OutcomeValue) -> ExpectedOutcome {
        ExpectedOutcome::new(kind, value)
    }

    #[test]
    fn test_action_match_case_insensitive() {
        let result = evaluate_outcome(
            &outcome(OutcomeKind::ActionMatch, OutcomeValue::Text("click".into())),
            &turn_result(&["CLICK"], ""),
            None,
        );
        assert!(result.passed);
        assert!(result.detail.contains("Matched: CLICK"));
    }

    #[test]
    fn test_action_match_failure_detail_names_both_sides() {
        let result = evaluate_outcome(
            &outcome(OutcomeKind::ActionMatch, OutcomeValue::Text("CLICK".into())),
            &turn_result(&["WAIT"], ""),
            None,
        );
        assert!(!result.passed);
        assert!(result.detail.contains(r#"Expected one of ["CLICK"], got ["WAIT"]"#));
    }

    #[test]
    fn test_action_not_match_reports_violations() {
        let result = evaluate_outcome(
            &outcome(
                OutcomeKind::ActionNotMatch,
                OutcomeValue::List(vec!["CLICK".into(), "TYPE".into()]),
            ),
            &turn_result(&["click"], ""),
            None,
        );
        assert!(!result.passed);
        assert!(result.detail.contains("Violations: CLICK"));
    }

    #[test]
    fn test_text_contains_snippet() {
        let result = evaluate_outcome(
            &outcome(OutcomeKind::TextContains, OutcomeValue::Text("Hello".into())),
            &turn_result(&[], "Well, hello there, friend"),
            None,
        );
        assert!(result.passed);
        assert!(result.actual_value.contains("hello there"));
    }

    #[test]
    fn test_text_contains_needle_trimmed_not_haystack() {
        let result = evaluate_outcome(
            &outcome(OutcomeKind::TextContains, OutcomeValue::Text("  hello  ".into())),
            &turn_result(&[], "oh hello!"),
            None,
        );
        assert!(result.passed);
    }

    #[test]
    fn test_text_not_contains() {
        let passing = evaluate_outcome(
            &outcome(OutcomeKind::TextNotContains, OutcomeValue::Text("secret".into())),
            &turn_result(&[], "nothing to see"),
            None,
        );
        assert!(passing.passed);

        let failing = evaluate_outcome(
            &outcome(OutcomeKind::TextNotContains, OutcomeValue::Text("secret".into())),
            &turn_result(&[], "the secret is out"),
            None,
        );
        assert!(!failing.passed);
        assert!(failing.detail.contains("Unexpectedly found"));
    }

    #[test]
    fn test_param_match_checks_combined_text() {
        let mut map = BTreeMap::new();
        map.insert("city".to_string(), "Tokyo".to_string());
        map.insert("unit".to_string(), "celsius".to_string());

        let mut turn = turn_result(&[], "The weather in tokyo looks fine");
        turn.thought = "user wants celsius".to_string();

        let result = evaluate_outcome(
            &outcome(OutcomeKind::ParamMatch, OutcomeValue::Map(map)),
            &turn,
            None,
        );
        assert!(result.passed);
    }

    #[test]
    fn test_memory_recalled_aliases_text_contains() {
        let result = evaluate_outcome(
            &outcome(OutcomeKind::MemoryRecalled, OutcomeValue::Text("blue".into())),
            &turn_result(&[], "Your favorite color is blue"),
            None,
        );
        assert!(result.passed);
    }

    #[test]
    fn test_providers_requested_accepts_consulted_set() {
        let mut turn = turn_result(&[], "");
        turn.providers_consulted = vec!["observation".to_string(), "recent_history".to_string()];

        let result = evaluate_outcome(
            &outcome(
                OutcomeKind::ProvidersRequested,
                OutcomeValue::List(vec!["RECENT_HISTORY".into()]),
            ),
            &turn,
            None,
        );
        assert!(result.passed);

        let result = evaluate_outcome(
            &outcome(
                OutcomeKind::ProvidersRequested,
                OutcomeValue::List(vec!["facts".into()]),
            ),
            &turn,
            None,
        );
        assert!(!result.passed);
        assert!(result.detail.contains("Missing: FACTS"));
    }

    #[test]
    fn test_custom_predicate_lookup() {
        let mut registry = AgentRegistry::new();
        registry.register_predicate(
            "two_actions",
            Arc::new(|turn: &TurnResult| turn.selected_actions.len() == 2),
        );

        let result = evaluate_outcome(
            &outcome(OutcomeKind::Custom, OutcomeValue::Text("two_actions".into())),
            &turn_result(&["A", "B"], ""),
            Some(&registry),
        );
        assert!(result.passed);

        let result = evaluate_outcome(
            &outcome(OutcomeKind::Custom, OutcomeValue::Text("nope".into())),
            &turn_result(&[], ""),
            Some(&registry),
        );
        assert!(!result.passed);
        assert!(result.detail.contains("unknown custom predicate"));
    }

    #[test]
    fn test_evaluation_is_pure() {
        let o = outcome(OutcomeKind::ActionMatch, OutcomeValue::Text("A".into()));
        let t = turn_result(&["A"], "x");
        let first = evaluate_outcome(&o, &t, None);
        let second = evaluate_outcome(&o, &t, None);
        assert_eq!(first.passed, second.passed);
        assert_eq!(first.detail, second.detail);
        assert_eq!(first.actual_value, second.actual_value);
    }

    #[test]
    fn test_evaluate_turn_covers_expected_and_forbidden() {
        let turn = Turn::user("go")
            .with_outcomes(vec![outcome(
                OutcomeKind::ActionMatch,
                OutcomeValue::Text("A".into()),
            )])
            .with_forbidden(vec![outcome(
                OutcomeKind::ActionNotMatch,
                OutcomeValue::Text("B".into()),
            )]);

        let results = evaluate_turn(&turn, &turn_result(&["A"], ""), None);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));
    }
}
