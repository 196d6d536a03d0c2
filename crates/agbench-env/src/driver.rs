use async_trait::async_trait;
use std::collections::HashSet;

use agbench_types::{ActionDecision, Observation, Scenario, StepResult};

use crate::error::Result;

/// Contract between the runner and a concrete execution environment
/// (container, VM, blockchain validator, in-memory store). A driver instance
/// is exclusively owned by one scenario at a time; drivers that cannot be
/// isolated force the global concurrency cap to 1.
///
/// All operations may fail with infrastructure errors only. `step` must be
/// total over ordinary agent mistakes: a nonsensical action produces a
/// StepResult, never an Err.
#[async_trait]
pub trait EnvironmentDriver: Send + Sync {
    fn name(&self) -> &str;

    /// Feature tags this driver can serve (e.g. "screenshot", "code_exec",
    /// "network"). Scenarios requiring more are skipped.
    fn capabilities(&self) -> HashSet<String> {
        HashSet::new()
    }

    /// Allocate resources for a scenario. May take tens of seconds.
    /// Idempotent within a scenario.
    async fn start(&mut self, scenario: &Scenario) -> Result<()>;

    /// Snapshot the current state. Non-mutating.
    async fn observe(&mut self) -> Result<Observation>;

    /// Apply one action and advance the environment.
    async fn step(&mut self, action: &ActionDecision) -> Result<StepResult>;

    /// Return to a clean slate. `within_scenario` distinguishes a
    /// `new_session` turn boundary from the cold start between scenarios.
    async fn reset(&mut self, within_scenario: bool) -> Result<Observation>;

    /// Release all resources. Always called; idempotent.
    async fn teardown(&mut self) -> Result<()>;
}
