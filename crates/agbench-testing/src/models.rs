use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use agbench_providers::{ModelHandler, ModelRequest};

/// Returns queued responses in order, then the default forever after.
/// Also logs every prompt it sees, for assertions on prompt content.
pub struct ScriptedModelHandler {
    responses: Mutex<VecDeque<String>>,
    default_response: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModelHandler {
    pub fn new(responses: Vec<String>, default_response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            default_response: default_response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }
}

#[async_trait]
impl ModelHandler for ScriptedModelHandler {
    async fn generate(&self, request: &ModelRequest) -> String {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(request.prompt.clone());
        self.responses
            .lock()
            .expect("response queue poisoned")
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone())
    }
}

/// Sleeps a scripted duration before each response, for timeout-path
/// tests. Delays are consumed in order; once exhausted it answers
/// immediately.
pub struct SlowModelHandler {
    delays: Mutex<VecDeque<Duration>>,
    response: String,
    calls: Mutex<usize>,
}

impl SlowModelHandler {
    pub fn new(delays: Vec<Duration>, response: impl Into<String>) -> Self {
        Self {
            delays: Mutex::new(delays.into()),
            response: response.into(),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().expect("call counter poisoned")
    }
}

#[async_trait]
impl ModelHandler for SlowModelHandler {
    async fn generate(&self, _request: &ModelRequest) -> String {
        *self.calls.lock().expect("call counter poisoned") += 1;
        let delay = self
            .delays
            .lock()
            .expect("delay queue poisoned")
            .pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}
