use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who sends a turn within a scenario.
///
/// `System` turns inject context into the conversation store without
/// eliciting an agent response. `Assistant` is parsed for compatibility with
/// older scenario files but rejected at validation time: assistant prefill
/// is modeled as `conversation_prefill` content, not as a scenario turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnActor {
    User,
    System,
    Assistant,
}

/// How to evaluate one assertion about the agent's output after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// At least one expected action name was selected.
    ActionMatch,
    /// None of the listed action names was selected (negative test).
    ActionNotMatch,
    /// Response text contains the substring (case-insensitive).
    TextContains,
    /// Response text does NOT contain the substring.
    TextNotContains,
    /// Every key→value pair appears in the combined response/thought/raw output.
    ParamMatch,
    /// Every listed provider was requested or actually ran.
    ProvidersRequested,
    /// A fact from earlier in the conversation appears in the response.
    /// Alias of TextContains, kept distinct for trace readability.
    MemoryRecalled,
    /// Dispatched to a registered predicate looked up by opaque id.
    Custom,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::ActionMatch => "action_match",
            OutcomeKind::ActionNotMatch => "action_not_match",
            OutcomeKind::TextContains => "text_contains",
            OutcomeKind::TextNotContains => "text_not_contains",
            OutcomeKind::ParamMatch => "param_match",
            OutcomeKind::ProvidersRequested => "providers_requested",
            OutcomeKind::MemoryRecalled => "memory_recalled",
            OutcomeKind::Custom => "custom",
        }
    }
}

/// Value attached to an expected outcome. The accepted shape depends on the
/// outcome kind: a single string, a list of strings, or a string→string map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutcomeValue {
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl OutcomeValue {
    /// Flatten a Text or List value into a list of strings.
    /// Returns None for Map values.
    pub fn as_list(&self) -> Option<Vec<String>> {
        match self {
            OutcomeValue::Text(s) => Some(vec![s.clone()]),
            OutcomeValue::List(items) => Some(items.clone()),
            OutcomeValue::Map(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            OutcomeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            OutcomeValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutcomeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeValue::Text(s) => write!(f, "{}", s),
            OutcomeValue::List(items) => write!(f, "{}", items.join(",")),
            OutcomeValue::Map(m) => {
                let pairs: Vec<String> = m.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{}", pairs.join(","))
            }
        }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// One assertion about the agent's output after a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutcome {
    pub kind: OutcomeKind,
    pub value: OutcomeValue,

    /// Contribution of this outcome to the turn's score, relative within a turn.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl ExpectedOutcome {
    pub fn new(kind: OutcomeKind, value: OutcomeValue) -> Self {
        Self {
            kind,
            value,
            weight: 1.0,
        }
    }

    pub fn weighted(kind: OutcomeKind, value: OutcomeValue, weight: f64) -> Self {
        Self {
            kind,
            value,
            weight,
        }
    }
}

/// One message in a scenario conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub actor: TurnActor,
    pub text: String,

    /// Outcomes checked after this turn's response. Empty for system turns
    /// and context-setting turns.
    #[serde(default)]
    pub expected_outcomes: Vec<ExpectedOutcome>,

    /// Outcomes that must NOT hold (violations fail the turn).
    #[serde(default)]
    pub forbidden_outcomes: Vec<ExpectedOutcome>,

    /// If true the environment is reset (within-scenario) before this turn,
    /// simulating the user returning in a fresh session.
    #[serde(default)]
    pub new_session: bool,

    /// Seconds to sleep before sending, so background jobs can fire.
    #[serde(default)]
    pub delay_seconds: f64,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            actor: TurnActor::User,
            text: text.into(),
            expected_outcomes: Vec::new(),
            forbidden_outcomes: Vec::new(),
            new_session: false,
            delay_seconds: 0.0,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            actor: TurnActor::System,
            ..Self::user(text)
        }
    }

    pub fn with_outcomes(mut self, outcomes: Vec<ExpectedOutcome>) -> Self {
        self.expected_outcomes = outcomes;
        self
    }

    pub fn with_forbidden(mut self, outcomes: Vec<ExpectedOutcome>) -> Self {
        self.forbidden_outcomes = outcomes;
        self
    }

    pub fn with_new_session(mut self) -> Self {
        self.new_session = true;
        self
    }

    /// All outcomes evaluated for this turn, expected first, then forbidden.
    pub fn all_outcomes(&self) -> Vec<ExpectedOutcome> {
        let mut all = self.expected_outcomes.clone();
        all.extend(self.forbidden_outcomes.iter().cloned());
        all
    }

    /// Whether this turn contributes to the scenario score.
    pub fn is_scored(&self) -> bool {
        !self.expected_outcomes.is_empty() || !self.forbidden_outcomes.is_empty()
    }
}

/// A complete declarative test case: ordered turns with expected outcomes.
/// Read-only after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Difficulty ordinal, 0 (action dispatch) through 3 (adversarial).
    pub level: u8,

    #[serde(default)]
    pub category: String,

    /// For filtering (e.g. "memory", "planning", "contact_mgmt").
    #[serde(default)]
    pub tags: Vec<String>,

    /// Driver feature tags this scenario needs (e.g. "screenshot").
    /// Scenarios a driver cannot serve are skipped.
    #[serde(default)]
    pub required_capabilities: Vec<String>,

    #[serde(default)]
    pub requires_memory: bool,

    #[serde(default)]
    pub requires_planning: bool,

    /// Distractor actions to register beyond the bootstrap set.
    #[serde(default)]
    pub distractor_count: usize,

    pub turns: Vec<Turn>,
}

impl Scenario {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Context load for one benchmark configuration. The run matrix is the
/// product scenarios × scale points × trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalePoint {
    /// Total actions registered (bootstrap + distractors).
    pub action_count: usize,
    /// Total providers registered (bootstrap + extras).
    pub provider_count: usize,
    /// Messages pre-filled in the conversation before the first turn.
    pub conversation_prefill: usize,
}

impl ScalePoint {
    pub fn new(action_count: usize, provider_count: usize, conversation_prefill: usize) -> Self {
        Self {
            action_count,
            provider_count,
            conversation_prefill,
        }
    }

    pub fn label(&self) -> String {
        format!(
            "a{}_p{}_m{}",
            self.action_count, self.provider_count, self.conversation_prefill
        )
    }

    /// Parse a label of the form `a10_p8_m0` back into a scale point.
    pub fn parse_label(label: &str) -> Option<Self> {
        let mut parts = label.split('_');
        let a = parts.next()?.strip_prefix('a')?.parse().ok()?;
        let p = parts.next()?.strip_prefix('p')?.parse().ok()?;
        let m = parts.next()?.strip_prefix('m')?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(a, p, m))
    }

    /// The default ladder the harness is stressed along.
    pub fn default_ladder() -> Vec<ScalePoint> {
        vec![
            ScalePoint::new(10, 8, 0),
            ScalePoint::new(25, 12, 10),
            ScalePoint::new(50, 18, 30),
            ScalePoint::new(100, 24, 60),
            ScalePoint::new(200, 30, 100),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_point_label_round_trip() {
        let sp = ScalePoint::new(25, 12, 10);
        assert_eq!(sp.label(), "a25_p12_m10");
        assert_eq!(ScalePoint::parse_label("a25_p12_m10"), Some(sp));
        assert_eq!(ScalePoint::parse_label("a25_p12"), None);
        assert_eq!(ScalePoint::parse_label("x25_p12_m10"), None);
    }

    #[test]
    fn test_outcome_value_untagged_parsing() {
        let text: OutcomeValue = serde_json::from_str(r#""CLICK""#).unwrap();
        assert_eq!(text.as_text(), Some("CLICK"));

        let list: OutcomeValue = serde_json::from_str(r#"["CLICK","TYPE"]"#).unwrap();
        assert_eq!(
            list.as_list(),
            Some(vec!["CLICK".to_string(), "TYPE".to_string()])
        );

        let map: OutcomeValue = serde_json::from_str(r#"{"x":"100"}"#).unwrap();
        assert_eq!(map.as_map().unwrap().get("x"), Some(&"100".to_string()));
    }

    #[test]
    fn test_outcome_weight_defaults_to_one() {
        let outcome: ExpectedOutcome =
            serde_json::from_str(r#"{"kind":"action_match","value":"CLICK"}"#).unwrap();
        assert_eq!(outcome.kind, OutcomeKind::ActionMatch);
        assert_eq!(outcome.weight, 1.0);
    }

    #[test]
    fn test_turn_is_scored() {
        let plain = Turn::user("hello");
        assert!(!plain.is_scored());

        let scored = Turn::user("hello").with_outcomes(vec![ExpectedOutcome::new(
            OutcomeKind::TextContains,
            OutcomeValue::Text("hi".into()),
        )]);
        assert!(scored.is_scored());
    }
}
