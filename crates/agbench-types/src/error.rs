use std::fmt;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the harness. Kinds, not provenance: configuration and
/// invariant violations are fatal, everything else is recovered locally and
/// surfaced on the affected result.
#[derive(Debug)]
pub enum Error {
    /// Malformed scenario, unknown action, unresolvable provider. Fatal at startup.
    Config(String),

    /// Environment failed to start or step raised. Marks the scenario errored.
    Driver(String),

    /// Upstream model API error or timeout after retry exhaustion.
    Model(String),

    /// Action handler raised or returned failure.
    Action(String),

    /// Outcome evaluation failure (unknown kind, unknown predicate).
    Evaluation(String),

    /// Cooperative cancellation; partial results are valid.
    Cancelled,

    /// Internal bug (e.g. a turn produced no action and no default). Fatal.
    Invariant(String),

    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Driver(msg) => write!(f, "Driver error: {}", msg),
            Error::Model(msg) => write!(f, "Model handler error: {}", msg),
            Error::Action(msg) => write!(f, "Action handler error: {}", msg),
            Error::Evaluation(msg) => write!(f, "Evaluation error: {}", msg),
            Error::Cancelled => write!(f, "cancelled"),
            Error::Invariant(msg) => write!(f, "Invariant violation: {}", msg),
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(format!("YAML: {}", err))
    }
}
