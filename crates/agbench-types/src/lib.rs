mod util;

pub mod action;
pub mod error;
pub mod loader;
pub mod observation;
pub mod result;
pub mod scenario;
pub mod trace;

pub use util::*;

pub use action::{ActionDecision, ActionResult, ProviderResult};
pub use error::{Error, Result};
pub use loader::{ScenarioFilter, load_path, load_str, validate};
pub use observation::{ConversationEntry, Observation, StepResult};
pub use result::{
    OutcomeResult, RunRecord, ScalingCurvePoint, ScenarioResult, TurnResult,
};
pub use scenario::{
    ExpectedOutcome, OutcomeKind, OutcomeValue, ScalePoint, Scenario, Turn, TurnActor,
};
pub use trace::{DecisionTrace, StepKind, TraceActor, TraceStep};
