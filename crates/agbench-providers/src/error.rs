use std::fmt;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the provider/action/model registries
#[derive(Debug)]
pub enum Error {
    /// An action with this name is already registered.
    DuplicateAction(String),

    /// A provider with this name is already registered.
    DuplicateProvider(String),

    /// No handler registered for the requested model type.
    UnknownModel(String),

    /// No safe-default action (REPLY / WAIT / NOOP) is registered.
    NoSafeDefault,

    /// A provider failed while composing state.
    Provider(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DuplicateAction(name) => write!(f, "duplicate action '{}'", name),
            Error::DuplicateProvider(name) => write!(f, "duplicate provider '{}'", name),
            Error::UnknownModel(kind) => write!(f, "no model handler for {}", kind),
            Error::NoSafeDefault => write!(
                f,
                "no safe-default action registered (need one of REPLY, WAIT, NOOP)"
            ),
            Error::Provider(msg) => write!(f, "provider error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
