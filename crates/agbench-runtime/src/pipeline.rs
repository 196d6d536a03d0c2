use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use agbench_providers::{
    ActionSpec, AgentRegistry, ComposedSection, ComposedState, HandlerOptions, ModelRequest,
    ModelType, PipelineMessage, coerce_parameters,
};
use agbench_types::{ActionDecision, ActionResult, StepKind, TraceActor, TurnActor};

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::parse::parse_model_output;
use crate::trace::TraceBuffer;

/// Provider sections that survive context truncation.
const PROTECTED_PROVIDERS: &[&str] = &["observation", "actions_catalog"];

/// Model call retry budget.
const MODEL_RETRY_ATTEMPTS: u32 = 3;

/// Sections shorter than this are dropped outright instead of shortened.
const MIN_SECTION_CHARS: usize = 80;

/// Everything one pipeline invocation produced, for the runner to fold
/// into a TurnResult.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub decision: ActionDecision,
    pub response_text: String,
    pub thought: String,
    pub raw_model_output: String,
    pub providers_requested: Vec<String>,
    pub providers_consulted: Vec<String>,
    pub action_results: Vec<ActionResult>,
}

/// The canonical message-handling path. Every agent decision flows through
/// here: compose state from providers, call the model, parse and validate
/// the decision, dispatch the action, optionally chain follow-ups, and
/// emit one trace step per stage.
pub struct MessagePipeline<'a> {
    registry: &'a AgentRegistry,
    config: &'a RunConfig,
}

impl<'a> MessagePipeline<'a> {
    pub fn new(registry: &'a AgentRegistry, config: &'a RunConfig) -> Self {
        Self { registry, config }
    }

    /// Produce exactly one action decision for the message. Provider and
    /// model failures degrade; only cancellation and configuration
    /// problems surface as errors.
    pub async fn handle_message(
        &self,
        message: &PipelineMessage,
        trace: &mut TraceBuffer,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput> {
        let mut current = message.clone();
        let mut output: Option<PipelineOutput> = None;
        let mut all_results: Vec<ActionResult> = Vec::new();
        let chain_budget = self.config.effective_chain_depth();

        for depth in 0..=chain_budget {
            let pass = self.run_once(&current, trace, cancel).await?;
            all_results.extend(pass.action_results.iter().cloned());

            let follow_up = pass
                .action_results
                .last()
                .and_then(|r| r.values.get("follow_up"))
                .and_then(|v| v.as_str())
                .map(String::from);

            let response = pass.response_text.clone();
            output = Some(pass);

            match follow_up {
                Some(text) if depth < chain_budget => {
                    debug!(depth, "chaining follow-up observation");
                    let mut observation = current.observation.clone();
                    observation.instruction = text.clone();
                    let mut conversation = current.conversation.clone();
                    conversation.push(agbench_types::ConversationEntry::new(
                        TurnActor::Assistant,
                        response,
                    ));
                    conversation.push(agbench_types::ConversationEntry::new(TurnActor::User, text));
                    current = PipelineMessage {
                        observation,
                        conversation,
                        only_include: current.only_include.clone(),
                    };
                }
                _ => break,
            }
        }

        let mut output = output.ok_or_else(|| {
            Error::Invariant("pipeline produced no decision and no default".to_string())
        })?;
        output.action_results = all_results;
        Ok(output)
    }

    /// One linear pass: steps 1-6 of the pipeline.
    async fn run_once(
        &self,
        message: &PipelineMessage,
        trace: &mut TraceBuffer,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutput> {
        // 1. Compose state from providers.
        let started = Instant::now();
        let composed = self.compose_state(message).await;
        trace.record(
            StepKind::ComposeState,
            TraceActor::Agent,
            started.elapsed().as_millis() as u64,
            json!({
                "providers": composed.providers_run,
                "chars": composed.text().len(),
            }),
        );

        // 2. Model call with retry and timeout.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let prompt = self.build_prompt(&composed);
        let started = Instant::now();
        let (raw_output, attempts) = self.call_model(&prompt).await?;
        trace.record(
            StepKind::ModelCall,
            TraceActor::Agent,
            started.elapsed().as_millis() as u64,
            json!({
                "attempts": attempts,
                "prompt_chars": prompt.len(),
                "response_chars": raw_output.len(),
            }),
        );

        // 3. Parse and validate against the registry.
        let parsed = parse_model_output(&raw_output);
        let providers_requested = parsed.providers.clone();
        let thought = parsed.thought.clone();
        let (spec, mut decision, degraded) = self.select_action(&parsed, &raw_output)?;
        decision.reasoning = thought.clone();
        trace.record(
            StepKind::ActionSelected,
            TraceActor::Agent,
            0,
            json!({
                "action": decision.action_name,
                "parameters": decision.parameters,
                "degraded": degraded,
            }),
        );

        // 4. Dispatch the action handler.
        let started = Instant::now();
        let action_result = self.dispatch(&spec, message, &composed, &decision).await;
        trace.record(
            StepKind::ActionExecuted,
            TraceActor::Agent,
            started.elapsed().as_millis() as u64,
            json!({
                "action": decision.action_name,
                "success": action_result.success,
                "error": action_result.error,
            }),
        );

        if let Some(code) = action_result.values.get("code").and_then(|v| v.as_str()) {
            decision.raw_code = Some(code.to_string());
        }

        let response_text = if !action_result.text.is_empty() {
            action_result.text.clone()
        } else {
            parsed.text.clone()
        };

        Ok(PipelineOutput {
            decision,
            response_text,
            thought,
            raw_model_output: raw_output,
            providers_requested,
            providers_consulted: composed.providers_run.clone(),
            action_results: vec![action_result],
        })
    }

    /// Gather provider contributions, reassemble by position, and enforce
    /// the context ceiling. A failing provider is logged and omitted; the
    /// pipeline never crashes on one.
    async fn compose_state(&self, message: &PipelineMessage) -> ComposedState {
        let providers: Vec<_> = self
            .registry
            .providers()
            .into_iter()
            .filter(|p| match &message.only_include {
                Some(only) => only.iter().any(|n| n.eq_ignore_ascii_case(p.name())),
                None => !p.private(),
            })
            .collect();

        let base = ComposedState::default();
        let futures: Vec<_> = providers
            .iter()
            .map(|p| p.get(self.registry, message, &base))
            .collect();
        let results = join_all(futures).await;

        let mut state = ComposedState::default();
        for (provider, result) in providers.iter().zip(results) {
            match result {
                Ok(contribution) => {
                    state.providers_run.push(provider.name().to_string());
                    if !contribution.text.is_empty() {
                        state.sections.push(ComposedSection {
                            provider: provider.name().to_string(),
                            position: provider.position(),
                            text: contribution.text,
                        });
                    }
                    state.values.extend(contribution.values);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "provider failed; omitting");
                }
            }
        }

        self.enforce_ceiling(&mut state);
        state
    }

    /// Shrink the longest unprotected sections until the composed text fits
    /// the ceiling. The observation and action catalog always survive.
    fn enforce_ceiling(&self, state: &mut ComposedState) {
        let ceiling = self.config.context_ceiling_chars;
        loop {
            let total: usize = state.sections.iter().map(|s| s.text.len()).sum();
            if total <= ceiling {
                return;
            }

            let victim = state
                .sections
                .iter()
                .enumerate()
                .filter(|(_, s)| !PROTECTED_PROVIDERS.contains(&s.provider.as_str()))
                .max_by_key(|(_, s)| s.text.len())
                .map(|(idx, s)| (idx, s.text.len()));

            let Some((idx, len)) = victim else {
                return;
            };

            if len <= MIN_SECTION_CHARS {
                state.sections.remove(idx);
            } else {
                let truncated = agbench_types::truncate(&state.sections[idx].text, len / 2);
                state.sections[idx].text = truncated;
            }
        }
    }

    fn build_prompt(&self, composed: &ComposedState) -> String {
        let action_names = self.registry.actions.names().join(", ");
        format!(
            "{system}\n\n{context}\n\n# Output Format\n\
             Respond with exactly one action per turn as a JSON object:\n\
             {{\"thought\": \"<your reasoning>\", \"action\": \"<ActionName>\", \"parameters\": {{...}}}}\n\
             An XML block <response><thought>...</thought><action>...</action>\
             <parameters>{{...}}</parameters></response> is also accepted.\n\
             Available actions: {actions}\n\
             If no action applies, use REPLY with a message parameter.",
            system = self.config.system_prompt,
            context = composed.text(),
            actions = action_names,
        )
    }

    /// Call the model with the configured timeout, retrying timeouts with
    /// exponential backoff. Exhaustion yields an empty response, which the
    /// caller degrades to the safe default.
    async fn call_model(&self, prompt: &str) -> Result<(String, u32)> {
        let handler = self
            .registry
            .models
            .resolve(ModelType::TextLarge, self.config.model_provider.as_deref())?;

        let request = ModelRequest {
            prompt: prompt.to_string(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stop: Vec::new(),
        };
        let call_timeout = Duration::from_millis(self.config.model_call_timeout_ms);

        let mut attempts = 0;
        while attempts < MODEL_RETRY_ATTEMPTS {
            attempts += 1;
            match tokio::time::timeout(call_timeout, handler.generate(&request)).await {
                Ok(response) => return Ok((response, attempts)),
                Err(_) => {
                    warn!(attempts, "model call timed out");
                    if attempts < MODEL_RETRY_ATTEMPTS {
                        let backoff = self.config.model_retry_backoff_ms << (attempts - 1);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }

        Ok((String::new(), attempts))
    }

    /// Resolve the parsed output to a registered action, degrading to the
    /// safe default when the output is empty, unknown, or incomplete.
    /// Returns (spec, decision, degraded).
    fn select_action(
        &self,
        parsed: &crate::parse::ParsedOutput,
        raw: &str,
    ) -> Result<(Arc<ActionSpec>, ActionDecision, bool)> {
        let freeform = raw.trim();

        let named = parsed.action.as_deref().and_then(|name| {
            self.registry.actions.resolve(name).map(|spec| (name.to_string(), spec))
        });

        if let Some((_, spec)) = named {
            let (parameters, missing) = coerce_parameters(&spec, &parsed.parameters);
            if missing.is_empty() {
                let mut decision = ActionDecision::named(spec.name.clone());
                decision.parameters = parameters;
                return Ok((spec, decision, false));
            }

            debug!(action = %spec.name, ?missing, "missing required parameters; degrading");
            let target = self.registry.actions.degraded_target().map_err(Error::from)?;
            return Ok((target.clone(), ActionDecision::named(target.name.clone()), true));
        }

        if freeform.is_empty() {
            // Retry exhaustion or a silent model: wait rather than emit noise.
            let target = self.registry.actions.degraded_target().map_err(Error::from)?;
            return Ok((target.clone(), ActionDecision::named(target.name.clone()), true));
        }

        // Freeform prose (or an unknown action name): treat as a reply.
        let target = self.registry.actions.safe_default().map_err(Error::from)?;
        let mut decision = ActionDecision::named(target.name.clone());
        if target.parameters.iter().any(|p| p.name == "message") {
            let reply = if parsed.text.is_empty() { freeform } else { &parsed.text };
            decision
                .parameters
                .insert("message".to_string(), json!(reply));
        }
        Ok((target, decision, parsed.action.is_some()))
    }

    /// Invoke the action handler under its own timeout. Handler failures
    /// are recorded, never raised.
    async fn dispatch(
        &self,
        spec: &ActionSpec,
        message: &PipelineMessage,
        composed: &ComposedState,
        decision: &ActionDecision,
    ) -> ActionResult {
        let options = HandlerOptions {
            parameters: decision.parameters.clone(),
        };
        let budget = Duration::from_millis(self.config.action_timeout_ms);

        match tokio::time::timeout(
            budget,
            spec.handler.handle(self.registry, message, composed, &options),
        )
        .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(action = %spec.name, error = %e, "action handler failed");
                ActionResult::failed(format!("action_handler: {}", e))
            }
            Err(_) => {
                warn!(action = %spec.name, "action handler timed out");
                ActionResult::failed("action_handler: timeout".to_string())
            }
        }
    }
}
