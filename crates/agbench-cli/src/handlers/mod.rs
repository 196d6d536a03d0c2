pub mod baselines;
pub mod list;
pub mod run;

use anyhow::{Context, Result};

use agbench_types::{Scenario, ScenarioFilter, load_path, validate};

use crate::args::FilterArgs;
use crate::scenarios::builtin_scenarios;

/// Load the scenario set (file, directory, or built-in suite) and apply
/// the selection flags. Memory/planning gating happens later, per config.
pub fn load_and_filter(filter: &FilterArgs) -> Result<Vec<Scenario>> {
    let scenarios = match &filter.scenarios {
        Some(path) => load_path(path)
            .with_context(|| format!("loading scenarios from {}", path.display()))?,
        None => {
            let builtin = builtin_scenarios();
            validate(&builtin).context("built-in scenario suite")?;
            builtin
        }
    };

    let selection = ScenarioFilter {
        levels: filter.levels.clone(),
        tags: filter.tags.clone(),
        ids: filter.ids.clone(),
        include_memory: true,
        include_planning: true,
    };
    Ok(selection.apply(&scenarios))
}
