// NOTE: Exit Code Contract
//
// 0 = run completed (even when scenarios scored poorly)
// 1 = infrastructure or configuration failure
// 2 = --fail-on threshold set and the mean score fell below it
//
// Evaluation quality is data, not an error: a low-scoring model is a valid
// benchmark outcome, so it only affects the exit code when the caller
// explicitly opts in via --fail-on.

mod args;
mod commands;
mod console;
mod handlers;
mod scenarios;

pub use args::{Cli, Commands};
pub use commands::run;
pub use scenarios::builtin_scenarios;
