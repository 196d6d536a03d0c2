use std::fmt;

/// Result type for environment driver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure faults raised by drivers. Ordinary agent mistakes never
/// surface here; `step` is total over those and reports through StepResult.
#[derive(Debug)]
pub enum Error {
    /// Resource allocation failed (container pull, VM boot, validator spin-up).
    Start(String),

    /// The environment broke mid-scenario.
    Infrastructure(String),

    /// Operation invoked before `start` or after `teardown`.
    NotStarted(String),

    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Start(msg) => write!(f, "Environment start failed: {}", msg),
            Error::Infrastructure(msg) => write!(f, "Environment infrastructure fault: {}", msg),
            Error::NotStarted(msg) => write!(f, "Environment not started: {}", msg),
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
