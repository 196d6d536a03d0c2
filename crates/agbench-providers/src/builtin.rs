use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use agbench_types::{ActionResult, ProviderResult, TurnActor};

use crate::actions::{
    ActionHandler, ActionSpec, HandlerOptions, ParamKind, ParamSpec,
};
use crate::error::Result;
use crate::provider::{ComposedState, ContextProvider, PipelineMessage};
use crate::registry::AgentRegistry;

/// Conversation entries the recent-history provider renders.
const HISTORY_WINDOW: usize = 10;

/// Register the bootstrap providers and actions every benchmark starts
/// from: the observation and catalog providers (protected from prompt
/// truncation), conversation history, and the REPLY / WAIT safe defaults.
pub fn bootstrap_registry(registry: &mut AgentRegistry) -> Result<()> {
    registry.register_provider(Arc::new(ObservationProvider))?;
    registry.register_provider(Arc::new(ActionsCatalogProvider))?;
    registry.register_provider(Arc::new(RecentHistoryProvider))?;
    registry.register_provider(Arc::new(ToolsCatalogProvider))?;

    registry.actions.register(ActionSpec::new(
        "REPLY",
        "Respond to the user with a text message",
        vec![ParamSpec::optional(
            "message",
            ParamKind::String,
            "The reply text; defaults to the reasoning text",
        )],
        Arc::new(ReplyHandler),
    ))?;
    registry.actions.register(ActionSpec::new(
        "WAIT",
        "Take no action this turn and wait for more information",
        vec![],
        Arc::new(WaitHandler),
    ))?;

    Ok(())
}

/// Desktop-automation action set for drivers that execute UI actions.
/// Benchmarks register these on top of the bootstrap when their driver
/// declares the matching capabilities.
pub fn desktop_actions() -> Vec<ActionSpec> {
    vec![
        ActionSpec::new(
            "CLICK",
            "Click at screen coordinates",
            vec![
                ParamSpec::required("x", ParamKind::Number, "X coordinate in pixels"),
                ParamSpec::required("y", ParamKind::Number, "Y coordinate in pixels"),
                ParamSpec::optional("button", ParamKind::String, "left, right or middle"),
            ],
            Arc::new(DesktopCodeHandler("click")),
        ),
        ActionSpec::new(
            "TYPE",
            "Type text into the focused element",
            vec![ParamSpec::required(
                "text",
                ParamKind::String,
                "The text to type",
            )],
            Arc::new(DesktopCodeHandler("type")),
        ),
        ActionSpec::new(
            "SCROLL",
            "Scroll the active window",
            vec![ParamSpec::required(
                "amount",
                ParamKind::Number,
                "Positive scrolls up, negative scrolls down",
            )],
            Arc::new(DesktopCodeHandler("scroll")),
        ),
        ActionSpec::new(
            "DONE",
            "Declare the task complete",
            vec![],
            Arc::new(DesktopCodeHandler("done")),
        ),
    ]
}

// --- Bootstrap action handlers ---

struct ReplyHandler;

#[async_trait]
impl ActionHandler for ReplyHandler {
    async fn handle(
        &self,
        _registry: &AgentRegistry,
        _message: &PipelineMessage,
        _state: &ComposedState,
        options: &HandlerOptions,
    ) -> Result<ActionResult> {
        let text = options
            .parameters
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        Ok(ActionResult::ok(text))
    }
}

struct WaitHandler;

#[async_trait]
impl ActionHandler for WaitHandler {
    async fn handle(
        &self,
        _registry: &AgentRegistry,
        _message: &PipelineMessage,
        _state: &ComposedState,
        _options: &HandlerOptions,
    ) -> Result<ActionResult> {
        Ok(ActionResult::ok("Waiting."))
    }
}

/// Emits a pyautogui-style code payload for the environment to execute.
struct DesktopCodeHandler(&'static str);

#[async_trait]
impl ActionHandler for DesktopCodeHandler {
    async fn handle(
        &self,
        _registry: &AgentRegistry,
        _message: &PipelineMessage,
        _state: &ComposedState,
        options: &HandlerOptions,
    ) -> Result<ActionResult> {
        let code = match self.0 {
            "click" => {
                let x = options.parameters.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let y = options.parameters.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0);
                format!("pyautogui.click({}, {})", x as i64, y as i64)
            }
            "type" => {
                let text = options
                    .parameters
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                format!("pyautogui.write({:?})", text)
            }
            "scroll" => {
                let amount = options
                    .parameters
                    .get("amount")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                format!("pyautogui.scroll({})", amount as i64)
            }
            _ => "DONE".to_string(),
        };
        Ok(ActionResult::ok("").with_value("code", json!(code)))
    }
}

// --- Bootstrap providers ---

/// Renders the current observation. Protected from prompt truncation.
struct ObservationProvider;

#[async_trait]
impl ContextProvider for ObservationProvider {
    fn name(&self) -> &str {
        "observation"
    }

    fn position(&self) -> i32 {
        -100
    }

    fn dynamic(&self) -> bool {
        true
    }

    async fn get(
        &self,
        _registry: &AgentRegistry,
        message: &PipelineMessage,
        _state: &ComposedState,
    ) -> Result<ProviderResult> {
        let obs = &message.observation;
        let mut text = format!(
            "# Current Task\n{}\n\nStep {} of {}.",
            obs.instruction,
            obs.step_index + 1,
            obs.max_steps
        );
        if !obs.previous_actions.is_empty() {
            text.push_str("\n\nPrevious actions:\n");
            for action in &obs.previous_actions {
                text.push_str(&format!("- {}\n", action));
            }
        }
        if let Some(state) = &obs.structured_state {
            text.push_str(&format!("\nEnvironment state:\n{}", state));
        }

        Ok(ProviderResult {
            text,
            values: [("step_index".to_string(), json!(obs.step_index))]
                .into_iter()
                .collect(),
            data: json!(null),
        })
    }
}

/// Enumerates the registered actions with their parameter schemas.
/// Protected from prompt truncation.
struct ActionsCatalogProvider;

#[async_trait]
impl ContextProvider for ActionsCatalogProvider {
    fn name(&self) -> &str {
        "actions_catalog"
    }

    fn position(&self) -> i32 {
        -50
    }

    async fn get(
        &self,
        registry: &AgentRegistry,
        _message: &PipelineMessage,
        _state: &ComposedState,
    ) -> Result<ProviderResult> {
        let mut text = String::from("# Available Actions\n");
        for spec in registry.actions.iter() {
            text.push_str(&format!("- {}: {}\n", spec.name, spec.description));
            for param in &spec.parameters {
                text.push_str(&format!(
                    "    {} ({}{}): {}\n",
                    param.name,
                    param.kind.as_str(),
                    if param.required { ", required" } else { "" },
                    param.description
                ));
            }
        }

        Ok(ProviderResult {
            text,
            values: [("action_names".to_string(), json!(registry.actions.names()))]
                .into_iter()
                .collect(),
            data: json!(null),
        })
    }
}

/// Renders the trailing window of the conversation.
struct RecentHistoryProvider;

#[async_trait]
impl ContextProvider for RecentHistoryProvider {
    fn name(&self) -> &str {
        "recent_history"
    }

    fn position(&self) -> i32 {
        10
    }

    fn dynamic(&self) -> bool {
        true
    }

    async fn get(
        &self,
        _registry: &AgentRegistry,
        message: &PipelineMessage,
        _state: &ComposedState,
    ) -> Result<ProviderResult> {
        if message.conversation.is_empty() {
            return Ok(ProviderResult::default());
        }

        let start = message.conversation.len().saturating_sub(HISTORY_WINDOW);
        let mut text = String::from("# Recent Conversation\n");
        for entry in &message.conversation[start..] {
            let role = match entry.actor {
                TurnActor::User => "user",
                TurnActor::Assistant => "assistant",
                TurnActor::System => "system",
            };
            text.push_str(&format!("{}: {}\n", role, entry.text));
        }

        Ok(ProviderResult::text_only(text))
    }
}

/// Summarizes tool-style capabilities (actions that carry parameters).
struct ToolsCatalogProvider;

#[async_trait]
impl ContextProvider for ToolsCatalogProvider {
    fn name(&self) -> &str {
        "tools_catalog"
    }

    fn position(&self) -> i32 {
        20
    }

    async fn get(
        &self,
        registry: &AgentRegistry,
        _message: &PipelineMessage,
        _state: &ComposedState,
    ) -> Result<ProviderResult> {
        let parameterized: Vec<String> = registry
            .actions
            .iter()
            .filter(|s| !s.parameters.is_empty())
            .map(|s| s.name.clone())
            .collect();

        if parameterized.is_empty() {
            return Ok(ProviderResult::default());
        }

        Ok(ProviderResult::text_only(format!(
            "# Parameterized Tools\n{}",
            parameterized.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agbench_types::Observation;

    fn message() -> PipelineMessage {
        PipelineMessage::new(Observation::new("click the button", 0, 5), Vec::new())
    }

    #[tokio::test]
    async fn test_bootstrap_registers_safe_defaults() {
        let mut registry = AgentRegistry::new();
        bootstrap_registry(&mut registry).unwrap();

        assert!(registry.actions.resolve("REPLY").is_some());
        assert!(registry.actions.resolve("WAIT").is_some());
        assert_eq!(registry.actions.safe_default().unwrap().name, "REPLY");
        assert_eq!(registry.provider_names()[0], "observation");
    }

    #[tokio::test]
    async fn test_observation_provider_renders_instruction() {
        let mut registry = AgentRegistry::new();
        bootstrap_registry(&mut registry).unwrap();

        let provider = ObservationProvider;
        let result = provider
            .get(&registry, &message(), &ComposedState::default())
            .await
            .unwrap();
        assert!(result.text.contains("click the button"));
        assert!(result.text.contains("Step 1 of 5"));
    }

    #[tokio::test]
    async fn test_actions_catalog_lists_registered_actions() {
        let mut registry = AgentRegistry::new();
        bootstrap_registry(&mut registry).unwrap();
        for spec in desktop_actions() {
            registry.actions.register(spec).unwrap();
        }

        let provider = ActionsCatalogProvider;
        let result = provider
            .get(&registry, &message(), &ComposedState::default())
            .await
            .unwrap();
        assert!(result.text.contains("CLICK"));
        assert!(result.text.contains("x (number, required)"));
    }

    #[tokio::test]
    async fn test_click_handler_emits_code() {
        let mut registry = AgentRegistry::new();
        bootstrap_registry(&mut registry).unwrap();

        let click = desktop_actions().remove(0);
        let mut options = HandlerOptions::default();
        options.parameters.insert("x".to_string(), json!(100));
        options.parameters.insert("y".to_string(), json!(200));

        let result = click
            .handler
            .handle(&registry, &message(), &ComposedState::default(), &options)
            .await
            .unwrap();
        assert_eq!(
            result.values.get("code").and_then(|v| v.as_str()),
            Some("pyautogui.click(100, 200)")
        );
    }
}
