use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};

use agbench_types::{ActionDecision, Observation, Scenario, StepResult};

use crate::driver::EnvironmentDriver;
use crate::error::{Error, Result};

/// Window of previous actions surfaced in each observation.
const ACTION_HISTORY_LIMIT: usize = 5;

/// The default driver: an in-memory environment with no external resources.
/// Holds the scenario instruction and a step counter, echoes executed
/// actions back through `previous_actions`, and never fails. Useful for
/// conversation-only benchmarks and as the substrate the mock model runs
/// against.
#[derive(Debug, Default)]
pub struct InMemoryDriver {
    instruction: String,
    max_steps: usize,
    step_index: usize,
    previous_actions: VecDeque<String>,
    started: bool,
}

impl InMemoryDriver {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps,
            ..Self::default()
        }
    }

    fn render_observation(&self) -> Observation {
        let mut obs = Observation::new(&self.instruction, self.step_index, self.max_steps);
        obs.previous_actions = self.previous_actions.iter().cloned().collect();
        obs.structured_state = Some(json!({
            "store": "in_memory",
            "steps_taken": self.step_index,
        }));
        obs
    }
}

#[async_trait]
impl EnvironmentDriver for InMemoryDriver {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn start(&mut self, scenario: &Scenario) -> Result<()> {
        self.instruction = scenario.description.clone();
        if self.instruction.is_empty() {
            self.instruction = scenario.name.clone();
        }
        if self.max_steps == 0 {
            self.max_steps = scenario.turns.len().max(1) * 2;
        }
        self.step_index = 0;
        self.previous_actions.clear();
        self.started = true;
        Ok(())
    }

    async fn observe(&mut self) -> Result<Observation> {
        if !self.started {
            return Err(Error::NotStarted("observe before start".to_string()));
        }
        Ok(self.render_observation())
    }

    async fn step(&mut self, action: &ActionDecision) -> Result<StepResult> {
        if !self.started {
            return Err(Error::NotStarted("step before start".to_string()));
        }

        self.step_index += 1;
        self.previous_actions.push_back(action.action_name.clone());
        while self.previous_actions.len() > ACTION_HISTORY_LIMIT {
            self.previous_actions.pop_front();
        }

        let mut info: BTreeMap<String, Value> = BTreeMap::new();
        info.insert("executed".to_string(), json!(action.action_name));

        Ok(StepResult {
            observation: self.render_observation(),
            reward: 0.0,
            done: self.step_index >= self.max_steps,
            info,
        })
    }

    async fn reset(&mut self, _within_scenario: bool) -> Result<Observation> {
        if !self.started {
            return Err(Error::NotStarted("reset before start".to_string()));
        }
        self.step_index = 0;
        self.previous_actions.clear();
        Ok(self.render_observation())
    }

    async fn teardown(&mut self) -> Result<()> {
        self.started = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbench_types::Turn;

    fn scenario() -> Scenario {
        Scenario {
            id: "s1".to_string(),
            name: "Echo".to_string(),
            description: "click the button".to_string(),
            level: 0,
            category: String::new(),
            tags: Vec::new(),
            required_capabilities: Vec::new(),
            requires_memory: false,
            requires_planning: false,
            distractor_count: 0,
            turns: vec![Turn::user("hi")],
        }
    }

    #[tokio::test]
    async fn test_step_echoes_actions_into_history() {
        let mut driver = InMemoryDriver::new(10);
        driver.start(&scenario()).await.unwrap();

        let result = driver.step(&ActionDecision::named("CLICK")).await.unwrap();
        assert_eq!(result.observation.step_index, 1);
        assert_eq!(result.observation.previous_actions, vec!["CLICK"]);
        assert!(!result.done);
    }

    #[tokio::test]
    async fn test_history_window_is_bounded() {
        let mut driver = InMemoryDriver::new(100);
        driver.start(&scenario()).await.unwrap();

        for i in 0..8 {
            driver
                .step(&ActionDecision::named(format!("A{i}")))
                .await
                .unwrap();
        }
        let obs = driver.observe().await.unwrap();
        assert_eq!(obs.previous_actions.len(), ACTION_HISTORY_LIMIT);
        assert_eq!(obs.previous_actions[0], "A3");
    }

    #[tokio::test]
    async fn test_reset_clears_state() {
        let mut driver = InMemoryDriver::new(10);
        driver.start(&scenario()).await.unwrap();
        driver.step(&ActionDecision::named("CLICK")).await.unwrap();

        let obs = driver.reset(true).await.unwrap();
        assert_eq!(obs.step_index, 0);
        assert!(obs.previous_actions.is_empty());
    }

    #[tokio::test]
    async fn test_observe_before_start_is_an_error() {
        let mut driver = InMemoryDriver::new(10);
        assert!(driver.observe().await.is_err());
    }
}
