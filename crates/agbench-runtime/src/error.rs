use std::fmt;

/// Result type for agbench-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer. Only configuration and
/// invariant violations propagate out of the runner; driver, model and
/// action errors are recovered locally and surfaced on results.
#[derive(Debug)]
pub enum Error {
    /// Types layer error
    Types(agbench_types::Error),

    /// Environment driver error
    Env(agbench_env::Error),

    /// Registry layer error
    Providers(agbench_providers::Error),

    /// Configuration error
    Config(String),

    /// Internal bug; aborts the run.
    Invariant(String),

    /// Cooperative cancellation
    Cancelled,

    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Types(err) => write!(f, "{}", err),
            Error::Env(err) => write!(f, "{}", err),
            Error::Providers(err) => write!(f, "{}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Invariant(msg) => write!(f, "Invariant violation: {}", msg),
            Error::Cancelled => write!(f, "cancelled"),
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Types(err) => Some(err),
            Error::Env(err) => Some(err),
            Error::Providers(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<agbench_types::Error> for Error {
    fn from(err: agbench_types::Error) -> Self {
        Error::Types(err)
    }
}

impl From<agbench_env::Error> for Error {
    fn from(err: agbench_env::Error) -> Self {
        Error::Env(err)
    }
}

impl From<agbench_providers::Error> for Error {
    fn from(err: agbench_providers::Error) -> Self {
        Error::Providers(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
