use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use agbench_types::{RunRecord, ScalingCurvePoint};

use crate::aggregate::{failure_breakdown, per_level_breakdown, worst_scenarios};

/// One curve point in the exported summary. Scores are rounded to 4
/// decimals and latencies to 1 so exports are stable across platforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSummaryPoint {
    pub scale_label: String,
    pub action_count: usize,
    pub score: f64,
    pub latency_ms: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerScenarioSummary {
    pub score: f64,
    pub latency_ms: f64,
    /// Actions selected per turn, for turns that selected any.
    pub actions: Vec<Vec<String>>,
}

/// The export contract: renderers accept this shape verbatim, and an
/// export/import round trip reproduces the same summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub metadata: BTreeMap<String, Value>,
    pub baselines: BTreeMap<String, f64>,
    pub scaling_curves: BTreeMap<String, Vec<CurveSummaryPoint>>,
    pub per_scenario: BTreeMap<String, PerScenarioSummary>,
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Flatten a run record into the exported JSON summary.
pub fn build_summary(record: &RunRecord) -> RunSummary {
    let mut summary = RunSummary {
        metadata: record.metadata.clone(),
        baselines: record.baselines.clone(),
        scaling_curves: BTreeMap::new(),
        per_scenario: BTreeMap::new(),
    };

    for (config_name, points) in &record.scaling_curves {
        summary.scaling_curves.insert(
            config_name.clone(),
            points
                .iter()
                .map(|p| CurveSummaryPoint {
                    scale_label: p.scale_label.clone(),
                    action_count: p.action_count,
                    score: round4(p.score),
                    latency_ms: round1(p.latency_ms),
                    count: p.scenario_count,
                })
                .collect(),
        );
    }

    for result in &record.results {
        let key = format!(
            "{}/{}/{}",
            result.scenario_id,
            result.config_name,
            result.scale_point.label()
        );
        summary.per_scenario.insert(
            key,
            PerScenarioSummary {
                score: round4(result.score),
                latency_ms: round1(result.total_latency_ms as f64),
                actions: result
                    .turn_results
                    .iter()
                    .filter(|t| !t.selected_actions.is_empty())
                    .map(|t| t.selected_actions.clone())
                    .collect(),
            },
        );
    }

    summary
}

/// Render the full Markdown report: header, baselines, curves, per-level
/// breakdown, worst scenarios, failed-outcome details.
pub fn render_markdown(record: &RunRecord) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# {} Report", record.benchmark_name));
    lines.push(String::new());
    for (label, key) in [("Model", "model"), ("Provider", "provider")] {
        if let Some(value) = record.metadata.get(key).and_then(|v| v.as_str()) {
            lines.push(format!("**{}**: {}", label, value));
        }
    }
    lines.push(format!("**Run**: {}", record.run_id));
    lines.push(format!("**Seed**: {}", record.seed));
    lines.push(format!("**Started**: {}", record.started_at.to_rfc3339()));
    lines.push(format!("**Scenario results**: {}", record.results.len()));
    lines.push(String::new());

    lines.push("## Baselines".to_string());
    lines.push(String::new());
    lines.push("| Baseline | Score |".to_string());
    lines.push("|----------|-------|".to_string());
    for (name, score) in &record.baselines {
        lines.push(format!("| {} | {:.1}% |", name, score * 100.0));
    }
    lines.push(String::new());

    lines.push("## Scaling Curves".to_string());
    lines.push(String::new());
    for (config_name, points) in &record.scaling_curves {
        lines.push(format!("### Config: {}", config_name));
        lines.push(String::new());
        lines.push(render_ascii_curve(points, config_name));
        lines.push(String::new());
        lines.push(
            "| Scale Point | Actions | Providers | Prefill | Score | Latency (ms) | Scenarios |"
                .to_string(),
        );
        lines.push(
            "|-------------|---------|-----------|---------|-------|--------------|-----------|"
                .to_string(),
        );
        for p in points {
            lines.push(format!(
                "| {} | {} | {} | {} | {:.1}% | {:.0} | {} |",
                p.scale_label,
                p.action_count,
                p.provider_count,
                p.conversation_prefill,
                p.score * 100.0,
                p.latency_ms,
                p.scenario_count
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Per-Level Breakdown".to_string());
    lines.push(String::new());
    lines.push("| Config/Level | Scale Point | Avg Score | Count |".to_string());
    lines.push("|--------------|-------------|-----------|-------|".to_string());
    for row in per_level_breakdown(&record.results) {
        lines.push(format!(
            "| {} | {} | {:.1}% | {} |",
            row.key,
            row.scale_label,
            row.avg_score * 100.0,
            row.count
        ));
    }
    lines.push(String::new());

    lines.push("## Lowest Scoring Scenarios".to_string());
    lines.push(String::new());
    lines.push("| Scenario | Config | Scale | Score | Error |".to_string());
    lines.push("|----------|--------|-------|-------|-------|".to_string());
    let worst = worst_scenarios(&record.results, 20);
    for result in &worst {
        let error = result
            .error
            .as_deref()
            .map(|e| agbench_types::truncate(e, 50))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "| {}: {} | {} | {} | {:.1}% | {} |",
            result.scenario_id,
            result.scenario_name,
            result.config_name,
            result.scale_point.label(),
            result.score * 100.0,
            error
        ));
    }
    lines.push(String::new());

    lines.push("## Failed Outcome Details".to_string());
    lines.push(String::new());
    for result in worst.iter().take(10) {
        if result.score >= 1.0 {
            continue;
        }
        lines.push(format!(
            "### {}: {} ({}, {})",
            result.scenario_id,
            result.scenario_name,
            result.config_name,
            result.scale_point.label()
        ));
        lines.push(String::new());
        for turn in &result.turn_results {
            let failed: Vec<_> = turn.outcome_results.iter().filter(|o| !o.passed).collect();
            if failed.is_empty() {
                continue;
            }
            let actions = if turn.selected_actions.is_empty() {
                "none".to_string()
            } else {
                turn.selected_actions.join(", ")
            };
            lines.push(format!("**Turn {}** (actions: {})", turn.turn_index, actions));
            for outcome in failed {
                lines.push(format!(
                    "  - FAIL [{}]: {}",
                    outcome.outcome.kind.as_str(),
                    agbench_types::truncate(&outcome.detail, 200)
                ));
            }
            lines.push(String::new());
        }
    }

    let breakdown = failure_breakdown(&record.results);
    if !breakdown.by_kind.is_empty() {
        lines.push("## Failure Breakdown".to_string());
        lines.push(String::new());
        lines.push("| Outcome Kind | Failures |".to_string());
        lines.push("|--------------|----------|".to_string());
        for (kind, count) in &breakdown.by_kind {
            lines.push(format!("| {} | {} |", kind, count));
        }
        lines.push(String::new());
        lines.push("| Category | Failures |".to_string());
        lines.push("|----------|----------|".to_string());
        for (category, count) in &breakdown.by_category {
            lines.push(format!("| {} | {} |", category, count));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Bar-per-scale-point ASCII rendering of one curve.
fn render_ascii_curve(points: &[ScalingCurvePoint], config_name: &str) -> String {
    if points.is_empty() {
        return "(no data)".to_string();
    }

    const HEIGHT: usize = 10;
    let scores: Vec<f64> = points.iter().map(|p| p.score.clamp(0.0, 1.0)).collect();

    let mut lines: Vec<String> = Vec::new();
    lines.push("```".to_string());
    lines.push(format!("  Scaling Curve ({})", config_name));
    lines.push(String::new());

    for row in (0..=HEIGHT).rev() {
        let threshold = row as f64 / HEIGHT as f64;
        let mut bars = String::new();
        for (i, score) in scores.iter().enumerate() {
            if i > 0 {
                bars.push_str("    ");
            }
            if *score >= threshold {
                bars.push_str("  ##  ");
            } else {
                bars.push_str("      ");
            }
        }
        lines.push(format!("  {:>4.0}% |{}", threshold * 100.0, bars));
    }

    let axis: String = points.iter().map(|_| "------").collect();
    lines.push(format!("        +{}---", axis));
    let labels: String = points
        .iter()
        .map(|p| format!("  {:^10}", p.scale_label))
        .collect();
    lines.push(format!("        {}", labels));
    lines.push("```".to_string());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbench_types::{ScalePoint, ScenarioResult, TurnResult};
    use uuid::Uuid;

    fn record() -> RunRecord {
        let mut record = RunRecord::new("agbench", "mock-agent", 42);
        record
            .metadata
            .insert("model".to_string(), serde_json::json!("mock"));
        record.baselines.insert("random".to_string(), 0.25);
        record.baselines.insert("always_reply".to_string(), 0.1);
        record.scaling_curves.insert(
            "basic".to_string(),
            vec![ScalingCurvePoint {
                scale_label: "a10_p8_m0".to_string(),
                action_count: 10,
                provider_count: 8,
                conversation_prefill: 0,
                score: 0.87654,
                latency_ms: 123.456,
                scenario_count: 10,
            }],
        );
        record.results.push(ScenarioResult {
            scenario_id: "s1".to_string(),
            scenario_name: "First".to_string(),
            level: 0,
            category: "general".to_string(),
            scale_point: ScalePoint::new(10, 8, 0),
            config_name: "basic".to_string(),
            turn_results: vec![TurnResult {
                selected_actions: vec!["CLICK".to_string()],
                ..TurnResult::default()
            }],
            score: 0.5,
            total_latency_ms: 200,
            model_name: "mock".to_string(),
            error: None,
            trace_id: Uuid::new_v4(),
        });
        record
    }

    #[test]
    fn test_summary_rounds_and_keys() {
        let summary = build_summary(&record());
        let curve = &summary.scaling_curves["basic"][0];
        assert_eq!(curve.score, 0.8765);
        assert_eq!(curve.latency_ms, 123.5);

        let per = &summary.per_scenario["s1/basic/a10_p8_m0"];
        assert_eq!(per.actions, vec![vec!["CLICK".to_string()]]);
    }

    #[test]
    fn test_summary_round_trip_is_lossless() {
        let summary = build_summary(&record());
        let json = serde_json::to_string_pretty(&summary).unwrap();
        let reloaded: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary, reloaded);
        // Re-serializing yields the same bytes.
        assert_eq!(json, serde_json::to_string_pretty(&reloaded).unwrap());
    }

    #[test]
    fn test_markdown_contains_all_sections() {
        let markdown = render_markdown(&record());
        for section in [
            "# agbench Report",
            "## Baselines",
            "## Scaling Curves",
            "## Per-Level Breakdown",
            "## Lowest Scoring Scenarios",
        ] {
            assert!(markdown.contains(section), "missing section {section}");
        }
        assert!(markdown.contains("a10_p8_m0"));
        assert!(markdown.contains("| random | 25.0% |"));
    }

    #[test]
    fn test_ascii_curve_shape() {
        let points = vec![ScalingCurvePoint {
            scale_label: "a10_p8_m0".to_string(),
            action_count: 10,
            provider_count: 8,
            conversation_prefill: 0,
            score: 1.0,
            latency_ms: 1.0,
            scenario_count: 1,
        }];
        let curve = render_ascii_curve(&points, "basic");
        assert!(curve.starts_with("```"));
        assert!(curve.contains("100% |  ##"));
        assert!(curve.lines().last().unwrap().contains("a10_p8_m0"));
        insta::assert_snapshot!(render_ascii_curve(&[], "basic"), @"(no data)");
    }
}
