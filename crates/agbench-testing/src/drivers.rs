use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use agbench_env::{EnvironmentDriver, Error, InMemoryDriver, Result};
use agbench_types::{ActionDecision, Observation, Scenario, StepResult};

/// One recorded driver invocation, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Start { scenario_id: String },
    Observe,
    Step { action: String },
    Reset { within_scenario: bool },
    Teardown,
}

/// Wraps the in-memory driver and records every call, for assertions on
/// runner behavior (reset-on-new-session, teardown-always, call order).
pub struct RecordingDriver {
    inner: InMemoryDriver,
    calls: Arc<Mutex<Vec<DriverCall>>>,
    capabilities: HashSet<String>,
}

impl RecordingDriver {
    pub fn new() -> (Self, Arc<Mutex<Vec<DriverCall>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                inner: InMemoryDriver::new(50),
                calls: calls.clone(),
                capabilities: HashSet::new(),
            },
            calls,
        )
    }

    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    fn record(&self, call: DriverCall) {
        self.calls.lock().expect("driver call log poisoned").push(call);
    }
}

#[async_trait]
impl EnvironmentDriver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn capabilities(&self) -> HashSet<String> {
        self.capabilities.clone()
    }

    async fn start(&mut self, scenario: &Scenario) -> Result<()> {
        self.record(DriverCall::Start {
            scenario_id: scenario.id.clone(),
        });
        self.inner.start(scenario).await
    }

    async fn observe(&mut self) -> Result<Observation> {
        self.record(DriverCall::Observe);
        self.inner.observe().await
    }

    async fn step(&mut self, action: &ActionDecision) -> Result<StepResult> {
        self.record(DriverCall::Step {
            action: action.action_name.clone(),
        });
        self.inner.step(action).await
    }

    async fn reset(&mut self, within_scenario: bool) -> Result<Observation> {
        self.record(DriverCall::Reset { within_scenario });
        self.inner.reset(within_scenario).await
    }

    async fn teardown(&mut self) -> Result<()> {
        self.record(DriverCall::Teardown);
        self.inner.teardown().await
    }
}

/// A driver that raises an infrastructure fault on a chosen operation,
/// for error-containment tests.
pub struct FlakyDriver {
    inner: InMemoryDriver,
    /// Fail `start` outright.
    pub fail_start: bool,
    /// Fail the Nth `step` call (0-based). None = never.
    pub fail_step_at: Option<usize>,
    steps_seen: usize,
}

impl FlakyDriver {
    pub fn failing_start() -> Self {
        Self {
            inner: InMemoryDriver::new(50),
            fail_start: true,
            fail_step_at: None,
            steps_seen: 0,
        }
    }

    pub fn failing_step_at(n: usize) -> Self {
        Self {
            inner: InMemoryDriver::new(50),
            fail_start: false,
            fail_step_at: Some(n),
            steps_seen: 0,
        }
    }
}

#[async_trait]
impl EnvironmentDriver for FlakyDriver {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn start(&mut self, scenario: &Scenario) -> Result<()> {
        if self.fail_start {
            return Err(Error::Start("injected start failure".to_string()));
        }
        self.inner.start(scenario).await
    }

    async fn observe(&mut self) -> Result<Observation> {
        self.inner.observe().await
    }

    async fn step(&mut self, action: &ActionDecision) -> Result<StepResult> {
        let n = self.steps_seen;
        self.steps_seen += 1;
        if self.fail_step_at == Some(n) {
            return Err(Error::Infrastructure("injected step failure".to_string()));
        }
        self.inner.step(action).await
    }

    async fn reset(&mut self, within_scenario: bool) -> Result<Observation> {
        self.inner.reset(within_scenario).await
    }

    async fn teardown(&mut self) -> Result<()> {
        self.inner.teardown().await
    }
}
