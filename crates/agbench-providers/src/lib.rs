mod actions;
mod builtin;
mod distractor;
mod error;
mod mock;
mod model;
mod provider;
mod registry;

pub use actions::{
    ActionHandler, ActionRegistry, ActionSpec, HandlerOptions, ParamKind, ParamSpec,
    coerce_parameters,
};
pub use builtin::{bootstrap_registry, desktop_actions};
pub use distractor::{distractor_actions, distractor_providers};
pub use error::{Error, Result};
pub use mock::MockModelHandler;
pub use model::{ModelHandler, ModelRegistry, ModelRequest, ModelType};
pub use provider::{ComposedSection, ComposedState, ContextProvider, PipelineMessage};
pub use registry::{AgentRegistry, CustomPredicate};
