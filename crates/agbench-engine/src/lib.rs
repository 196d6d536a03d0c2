// Engine module - pure processing logic over typed results
// (evaluation, scoring, baselines, aggregation, report building).
// This layer sits between the runner's raw outputs and CLI presentation.

mod aggregate;
mod baseline;
mod evaluator;
mod report;
mod score;

pub use aggregate::{
    FailureBreakdown, LevelBreakdownRow, build_scaling_curves, failure_breakdown,
    per_level_breakdown, worst_scenarios,
};
pub use baseline::{always_reply_baseline, random_baseline};
pub use evaluator::{evaluate_outcome, evaluate_turn};
pub use report::{
    CurveSummaryPoint, PerScenarioSummary, RunSummary, build_summary, render_markdown,
};
pub use score::{compute_scenario_score, compute_turn_score};
