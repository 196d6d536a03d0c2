// NOTE: Command Organization Rationale
//
// Three subcommands mirror the benchmark workflow: `list` to inspect the
// scenario set, `baselines` to anchor expectations, `run` to execute the
// matrix. Filter flags (--levels/--tags/--ids) are repeated on each
// subcommand rather than made global so `--help` shows them where they
// apply.

mod commands;
mod enums;

pub use commands::*;
pub use enums::*;

use clap::Parser;

#[derive(Parser)]
#[command(name = "agbench")]
#[command(about = "Run scenario-driven agent benchmarks and render reports", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, default_value = "./agbench_results", global = true)]
    pub output: String,

    #[arg(long, default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
