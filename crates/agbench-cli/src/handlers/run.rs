use anyhow::{Result, bail};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use agbench_engine::render_markdown;
use agbench_env::{EnvironmentDriver, InMemoryDriver};
use agbench_providers::{MockModelHandler, ModelHandler};
use agbench_runtime::{Harness, OutputPaths, RunConfig};
use agbench_types::ScalePoint;

use crate::args::{ConfigSet, FilterArgs};
use crate::console;
use crate::handlers::load_and_filter;

#[allow(clippy::too_many_arguments)]
pub async fn handle(
    output: &str,
    filter: FilterArgs,
    scale: Vec<String>,
    trials: usize,
    seed: u64,
    model: Option<String>,
    provider: Option<String>,
    concurrency: usize,
    mock: bool,
    fail_on: Option<f64>,
    config: ConfigSet,
) -> Result<i32> {
    let scenarios = load_and_filter(&filter)?;
    if scenarios.is_empty() {
        bail!("no scenarios match the given filters");
    }

    let mut run_config = RunConfig {
        config_names: config.config_names(),
        trials,
        seed,
        concurrency,
        model_provider: provider,
        ..RunConfig::default()
    };
    if let Some(model) = model {
        run_config.model_name = model;
    }
    if !scale.is_empty() {
        let mut points = Vec::new();
        for label in &scale {
            match ScalePoint::parse_label(label) {
                Some(point) => points.push(point),
                None => bail!("invalid scale point label '{}' (expected e.g. a10_p8_m0)", label),
            }
        }
        run_config.scale_points = points;
    }

    let (model_handler, provider_name) = resolve_model(&mut run_config, mock)?;

    let cancel = CancellationToken::new();
    let ctrlc_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || ctrlc_token.cancel()) {
        warn!(error = %e, "could not install ctrl-c handler");
    }

    let harness = Harness::new(run_config, model_handler, provider_name);
    let (record, traces) = harness
        .run(
            &scenarios,
            Arc::new(|| Box::new(InMemoryDriver::new(50)) as Box<dyn EnvironmentDriver>),
            cancel.clone(),
        )
        .await?;

    let markdown = render_markdown(&record);
    let paths = OutputPaths::new(output, &record);
    paths.write_all(&record, &traces, &markdown)?;

    console::print_summary(&record);
    println!("Summary: {}", paths.summary_path().display());
    println!("Report:  {}", paths.report_path().display());
    println!("Traces:  {}", paths.traces_dir().display());

    if cancel.is_cancelled() {
        println!("\nRun was cancelled; partial results were written.");
    }

    if let Some(threshold) = fail_on {
        let mean = if record.results.is_empty() {
            0.0
        } else {
            record.results.iter().map(|r| r.score).sum::<f64>() / record.results.len() as f64
        };
        if mean < threshold {
            eprintln!(
                "Mean score {:.1}% is below --fail-on threshold {:.1}%",
                mean * 100.0,
                threshold * 100.0
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Pick the model handler for this run. Concrete provider SDKs live
/// outside this repository behind the ModelHandler interface; the CLI
/// ships the deterministic mock only.
fn resolve_model(
    config: &mut RunConfig,
    mock: bool,
) -> Result<(Arc<dyn ModelHandler>, String)> {
    if mock || config.model_name == "mock" {
        config.model_name = "mock".to_string();
        // The mock registers under its own provider name.
        config.model_provider = None;
        return Ok((Arc::new(default_mock()), "mock".to_string()));
    }

    bail!(
        "no model handler is built in for '{}'; run with --mock, or embed a \
         handler for your provider through the agbench-runtime Harness API",
        config.model_name
    )
}

/// Substring-triggered decisions that make the built-in suite exercise
/// more than the REPLY path. Deterministic.
fn default_mock() -> MockModelHandler {
    MockModelHandler::new()
        .rule(
            "Submit button",
            MockModelHandler::action_json(
                "the form needs a click",
                "CLICK",
                json!({"x": 640, "y": 480}),
            ),
        )
        .rule(
            "timer",
            MockModelHandler::action_json("starting a timer", "SET_TIMER", json!({"target": "10m"})),
        )
        .rule(
            "favorite color",
            MockModelHandler::action_json(
                "recalling the stated color",
                "REPLY",
                json!({"message": "Your favorite color is teal."}),
            ),
        )
}
