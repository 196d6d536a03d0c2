use std::collections::BTreeMap;

use agbench_types::{ScalePoint, ScalingCurvePoint, ScenarioResult};

/// Group results by (config, scale point) and reduce each group to one
/// curve point, ordered along the given ladder. Configs come out sorted.
pub fn build_scaling_curves(
    results: &[ScenarioResult],
    ladder: &[ScalePoint],
) -> BTreeMap<String, Vec<ScalingCurvePoint>> {
    let mut groups: BTreeMap<(String, String), Vec<&ScenarioResult>> = BTreeMap::new();
    for result in results {
        groups
            .entry((result.config_name.clone(), result.scale_point.label()))
            .or_default()
            .push(result);
    }

    let mut curves: BTreeMap<String, Vec<ScalingCurvePoint>> = BTreeMap::new();
    let config_names: Vec<String> = {
        let mut names: Vec<String> = results.iter().map(|r| r.config_name.clone()).collect();
        names.sort();
        names.dedup();
        names
    };

    for config_name in config_names {
        let mut points = Vec::new();
        for scale_point in ladder {
            let key = (config_name.clone(), scale_point.label());
            let Some(group) = groups.get(&key) else {
                continue;
            };
            let count = group.len();
            let avg_score = group.iter().map(|r| r.score).sum::<f64>() / count as f64;
            let avg_latency =
                group.iter().map(|r| r.total_latency_ms as f64).sum::<f64>() / count as f64;
            points.push(ScalingCurvePoint {
                scale_label: scale_point.label(),
                action_count: scale_point.action_count,
                provider_count: scale_point.provider_count,
                conversation_prefill: scale_point.conversation_prefill,
                score: avg_score,
                latency_ms: avg_latency,
                scenario_count: count,
            });
        }
        curves.insert(config_name, points);
    }

    curves
}

/// One row of the per-level breakdown table.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelBreakdownRow {
    /// `<config>/L<level>`
    pub key: String,
    pub scale_label: String,
    pub avg_score: f64,
    pub count: usize,
}

/// Average scores grouped by (config, level, scale point), sorted by key
/// then scale label.
pub fn per_level_breakdown(results: &[ScenarioResult]) -> Vec<LevelBreakdownRow> {
    let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
    for result in results {
        let key = format!("{}/L{}", result.config_name, result.level);
        groups
            .entry((key, result.scale_point.label()))
            .or_default()
            .push(result.score);
    }

    groups
        .into_iter()
        .map(|((key, scale_label), scores)| LevelBreakdownRow {
            key,
            scale_label,
            avg_score: scores.iter().sum::<f64>() / scores.len() as f64,
            count: scores.len(),
        })
        .collect()
}

/// Failed-outcome counts, grouped two ways. Counts only, no payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailureBreakdown {
    pub by_kind: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

pub fn failure_breakdown(results: &[ScenarioResult]) -> FailureBreakdown {
    let mut breakdown = FailureBreakdown::default();
    for result in results {
        let category = if result.category.is_empty() {
            "uncategorized"
        } else {
            result.category.as_str()
        };
        for turn in &result.turn_results {
            for outcome in turn.outcome_results.iter().filter(|o| !o.passed) {
                *breakdown
                    .by_kind
                    .entry(outcome.outcome.kind.as_str().to_string())
                    .or_default() += 1;
                *breakdown.by_category.entry(category.to_string()).or_default() += 1;
            }
        }
    }
    breakdown
}

/// The lowest-scoring results, stable order for ties.
pub fn worst_scenarios(results: &[ScenarioResult], limit: usize) -> Vec<&ScenarioResult> {
    let mut sorted: Vec<&ScenarioResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbench_types::{
        ExpectedOutcome, OutcomeKind, OutcomeResult, OutcomeValue, TurnResult,
    };
    use uuid::Uuid;

    fn result(config: &str, sp: ScalePoint, level: u8, score: f64) -> ScenarioResult {
        ScenarioResult {
            scenario_id: format!("s-{score}"),
            scenario_name: String::new(),
            level,
            category: "general".to_string(),
            scale_point: sp,
            config_name: config.to_string(),
            turn_results: Vec::new(),
            score,
            total_latency_ms: 100,
            model_name: "mock".to_string(),
            error: None,
            trace_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_curves_follow_ladder_order() {
        let small = ScalePoint::new(10, 8, 0);
        let large = ScalePoint::new(50, 18, 30);
        let ladder = vec![small, large];

        let results = vec![
            result("basic", large, 0, 0.5),
            result("basic", small, 0, 1.0),
            result("basic", small, 0, 0.8),
        ];

        let curves = build_scaling_curves(&results, &ladder);
        let points = &curves["basic"];
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].scale_label, "a10_p8_m0");
        assert!((points[0].score - 0.9).abs() < 1e-9);
        assert_eq!(points[0].scenario_count, 2);
        assert_eq!(points[1].scenario_count, 1);
    }

    #[test]
    fn test_per_level_breakdown_groups_and_sorts() {
        let sp = ScalePoint::new(10, 8, 0);
        let results = vec![
            result("basic", sp, 1, 0.4),
            result("basic", sp, 0, 1.0),
            result("basic", sp, 0, 0.0),
        ];

        let rows = per_level_breakdown(&results);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "basic/L0");
        assert!((rows[0].avg_score - 0.5).abs() < 1e-9);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[1].key, "basic/L1");
    }

    #[test]
    fn test_failure_breakdown_counts_failed_outcomes_only() {
        let sp = ScalePoint::new(10, 8, 0);
        let mut r = result("basic", sp, 0, 0.5);
        r.turn_results = vec![TurnResult {
            outcome_results: vec![
                OutcomeResult {
                    outcome: ExpectedOutcome::new(
                        OutcomeKind::ActionMatch,
                        OutcomeValue::Text("A".into()),
                    ),
                    passed: false,
                    actual_value: String::new(),
                    detail: String::new(),
                },
                OutcomeResult {
                    outcome: ExpectedOutcome::new(
                        OutcomeKind::TextContains,
                        OutcomeValue::Text("x".into()),
                    ),
                    passed: true,
                    actual_value: String::new(),
                    detail: String::new(),
                },
            ],
            ..TurnResult::default()
        }];

        let breakdown = failure_breakdown(&[r]);
        assert_eq!(breakdown.by_kind.get("action_match"), Some(&1));
        assert_eq!(breakdown.by_kind.get("text_contains"), None);
        assert_eq!(breakdown.by_category.get("general"), Some(&1));
    }

    #[test]
    fn test_worst_scenarios_sorted_ascending() {
        let sp = ScalePoint::new(10, 8, 0);
        let results = vec![
            result("basic", sp, 0, 0.9),
            result("basic", sp, 0, 0.1),
            result("basic", sp, 0, 0.5),
        ];
        let worst = worst_scenarios(&results, 2);
        assert_eq!(worst.len(), 2);
        assert!(worst[0].score <= worst[1].score);
        assert!((worst[0].score - 0.1).abs() < 1e-9);
    }
}
