use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use agbench_types::ActionResult;

use crate::error::{Error, Result};
use crate::provider::{ComposedState, PipelineMessage};
use crate::registry::AgentRegistry;

/// Parameter value shape declared by an action schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One declared parameter of an action.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamKind, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Coerced parameters passed to an action handler.
#[derive(Debug, Clone, Default)]
pub struct HandlerOptions {
    pub parameters: BTreeMap<String, Value>,
}

/// Executes the semantics of an action (emit code, submit a transaction,
/// write a file). Receives the registry first so providers and actions
/// stay free of back-references.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(
        &self,
        registry: &AgentRegistry,
        message: &PipelineMessage,
        state: &ComposedState,
        options: &HandlerOptions,
    ) -> Result<ActionResult>;
}

/// A named agent capability: schema plus handler.
#[derive(Clone)]
pub struct ActionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
    pub handler: Arc<dyn ActionHandler>,
}

impl std::fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSpec")
            .field("name", &self.name)
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

impl ActionSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParamSpec>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }
}

/// Names accepted as degradation targets, in preference order.
const SAFE_DEFAULTS: &[&str] = &["REPLY", "WAIT", "NOOP"];

/// Case-insensitive action catalog. Read-only after bootstrap.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    specs: Vec<Arc<ActionSpec>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: ActionSpec) -> Result<()> {
        if self.resolve(&spec.name).is_some() {
            return Err(Error::DuplicateAction(spec.name));
        }
        self.specs.push(Arc::new(spec));
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<Arc<ActionSpec>> {
        self.specs
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.specs.iter().map(|s| s.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ActionSpec>> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The degradation target the pipeline falls back to when the model
    /// output is unusable. Every benchmark must register at least one.
    pub fn safe_default(&self) -> Result<Arc<ActionSpec>> {
        SAFE_DEFAULTS
            .iter()
            .find_map(|name| self.resolve(name))
            .ok_or(Error::NoSafeDefault)
    }

    /// The action an incomplete-but-recognized decision degrades to:
    /// WAIT when available, otherwise the safe default.
    pub fn degraded_target(&self) -> Result<Arc<ActionSpec>> {
        if let Some(wait) = self.resolve("WAIT") {
            return Ok(wait);
        }
        self.safe_default()
    }
}

/// Coerce raw parameters to an action's declared schema. Unknown keys are
/// dropped, scalar values are converted toward the declared kind, and the
/// names of missing required parameters are returned so the caller can
/// degrade the action.
pub fn coerce_parameters(
    spec: &ActionSpec,
    raw: &BTreeMap<String, Value>,
) -> (BTreeMap<String, Value>, Vec<String>) {
    let mut coerced = BTreeMap::new();
    let mut missing = Vec::new();

    for param in &spec.parameters {
        match raw.get(&param.name).and_then(|v| coerce_value(v, param.kind)) {
            Some(value) => {
                coerced.insert(param.name.clone(), value);
            }
            None => {
                if param.required {
                    missing.push(param.name.clone());
                }
            }
        }
    }

    (coerced, missing)
}

fn coerce_value(value: &Value, kind: ParamKind) -> Option<Value> {
    match kind {
        ParamKind::String => match value {
            Value::String(_) => Some(value.clone()),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        ParamKind::Number => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(|f| {
                serde_json::Number::from_f64(f).map(Value::Number)
            }),
            _ => None,
        },
        ParamKind::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
    }
}
