use anyhow::Result;
use std::sync::Arc;

use agbench_engine::{always_reply_baseline, random_baseline};
use agbench_providers::MockModelHandler;
use agbench_runtime::{Harness, RunConfig};
use agbench_types::ScalePoint;

use crate::args::FilterArgs;
use crate::handlers::load_and_filter;

pub fn handle(filter: FilterArgs, seed: u64) -> Result<i32> {
    let scenarios = load_and_filter(&filter)?;

    // The baseline action pool is the catalog at the mid-ladder scale.
    let harness = Harness::new(
        RunConfig { seed, ..RunConfig::default() },
        Arc::new(MockModelHandler::new()),
        "mock",
    );
    let registry = harness.build_registry(ScalePoint::new(50, 18, 30))?;
    let action_pool = registry.actions.names();

    println!(
        "Computing baselines for {} scenarios ({} actions in pool, seed {})...",
        scenarios.len(),
        action_pool.len(),
        seed
    );
    println!();

    let random = random_baseline(&scenarios, &action_pool, seed);
    let reply = always_reply_baseline(&scenarios);

    println!("  Random baseline:       {:.1}%", random * 100.0);
    println!("  Always-REPLY baseline: {:.1}%", reply * 100.0);
    println!();
    println!("Any real agent should score well above both baselines.");

    Ok(0)
}
