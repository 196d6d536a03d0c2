use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Which registry configurations to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigSet {
    /// Bootstrap capabilities only; memory/planning scenarios excluded.
    Basic,
    /// Full capabilities, including memory/planning scenarios.
    Full,
    /// Both configurations back to back.
    All,
}

impl ConfigSet {
    pub fn config_names(&self) -> Vec<String> {
        match self {
            ConfigSet::Basic => vec!["basic".to_string()],
            ConfigSet::Full => vec!["full".to_string()],
            ConfigSet::All => vec!["basic".to_string(), "full".to_string()],
        }
    }
}
