use async_trait::async_trait;
use std::sync::Arc;

use agbench_types::{ActionResult, ProviderResult};

use crate::actions::{ActionHandler, ActionSpec, HandlerOptions, ParamKind, ParamSpec};
use crate::error::Result;
use crate::provider::{ComposedState, ContextProvider, PipelineMessage};
use crate::registry::AgentRegistry;

/// Plausible capability names the scale ladder pads the catalog with.
/// Cycled with a numeric suffix once exhausted.
const DISTRACTOR_ACTION_POOL: &[(&str, &str)] = &[
    ("SET_TIMER", "Set a countdown timer"),
    ("CHECK_WEATHER", "Look up the weather forecast"),
    ("CREATE_CONTACT", "Add a new contact entry"),
    ("SEND_EMAIL", "Compose and send an email"),
    ("PLAY_MUSIC", "Start music playback"),
    ("TAKE_SCREENSHOT", "Capture the current screen"),
    ("OPEN_CALENDAR", "Open the calendar view"),
    ("TRANSLATE_TEXT", "Translate text between languages"),
    ("SEARCH_WEB", "Run a web search"),
    ("SUMMARIZE_DOCUMENT", "Summarize a document"),
    ("TRACK_PACKAGE", "Track a shipment"),
    ("BOOK_MEETING", "Schedule a meeting"),
    ("CONVERT_UNITS", "Convert between units"),
    ("READ_NEWS", "Fetch news headlines"),
    ("TOGGLE_LIGHTS", "Toggle smart lights"),
    ("START_WORKOUT", "Begin a workout session"),
    ("LOG_EXPENSE", "Record an expense"),
    ("FIND_RECIPE", "Look up a recipe"),
    ("CHECK_STOCKS", "Check stock prices"),
    ("NAVIGATE_HOME", "Start navigation home"),
];

struct DistractorActionHandler(String);

#[async_trait]
impl ActionHandler for DistractorActionHandler {
    async fn handle(
        &self,
        _registry: &AgentRegistry,
        _message: &PipelineMessage,
        _state: &ComposedState,
        _options: &HandlerOptions,
    ) -> Result<ActionResult> {
        Ok(ActionResult::ok(format!("Executed {}.", self.0)))
    }
}

/// Generate `count` distractor actions with names that do not collide with
/// the pool on repeated cycles. Deterministic.
pub fn distractor_actions(count: usize) -> Vec<ActionSpec> {
    (0..count)
        .map(|i| {
            let (base, description) = DISTRACTOR_ACTION_POOL[i % DISTRACTOR_ACTION_POOL.len()];
            let cycle = i / DISTRACTOR_ACTION_POOL.len();
            let name = if cycle == 0 {
                base.to_string()
            } else {
                format!("{}_{}", base, cycle + 1)
            };
            ActionSpec::new(
                name.clone(),
                description,
                vec![ParamSpec::optional(
                    "target",
                    ParamKind::String,
                    "What to apply the action to",
                )],
                Arc::new(DistractorActionHandler(name)),
            )
        })
        .collect()
}

/// Filler context provider used to pad the provider count at larger scale
/// points. Sits after all bootstrap providers and is the first text
/// truncated when the prompt exceeds its ceiling.
struct DistractorProvider {
    name: String,
    index: usize,
}

#[async_trait]
impl ContextProvider for DistractorProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn position(&self) -> i32 {
        100 + self.index as i32
    }

    async fn get(
        &self,
        _registry: &AgentRegistry,
        _message: &PipelineMessage,
        _state: &ComposedState,
    ) -> Result<ProviderResult> {
        Ok(ProviderResult::text_only(format!(
            "# Background Context {}\nAuxiliary subsystem {} reports nominal status. \
             No user-facing changes since the last check.",
            self.index, self.index
        )))
    }
}

/// Generate `count` distractor providers. Deterministic.
pub fn distractor_providers(count: usize) -> Vec<Arc<dyn ContextProvider>> {
    (0..count)
        .map(|i| {
            Arc::new(DistractorProvider {
                name: format!("distractor_ctx_{}", i),
                index: i,
            }) as Arc<dyn ContextProvider>
        })
        .collect()
}
