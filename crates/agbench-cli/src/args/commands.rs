use super::enums::ConfigSet;
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Scenario selection flags shared by every subcommand.
#[derive(Args, Clone)]
pub struct FilterArgs {
    #[arg(
        long,
        help = "Scenario file or directory (.json/.yaml); defaults to the built-in suite"
    )]
    pub scenarios: Option<PathBuf>,

    #[arg(long, num_args = 1.., help = "Keep scenarios at these difficulty levels (0-3)")]
    pub levels: Vec<u8>,

    #[arg(long, num_args = 1.., help = "Keep scenarios sharing at least one of these tags")]
    pub tags: Vec<String>,

    #[arg(long, num_args = 1.., help = "Keep exactly these scenario ids")]
    pub ids: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Execute the benchmark matrix (scenarios × scale points × trials)")]
    Run {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, num_args = 1.., help = "Scale point labels to run (e.g. a10_p8_m0)")]
        scale: Vec<String>,

        #[arg(long, default_value = "1")]
        trials: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long, help = "Model name (default: MODEL_NAME env var, then 'mock')")]
        model: Option<String>,

        #[arg(long, help = "Model provider override for handler resolution")]
        provider: Option<String>,

        #[arg(long, default_value = "1", help = "Concurrently running scenarios")]
        concurrency: usize,

        #[arg(long, help = "Use the deterministic mock model handler")]
        mock: bool,

        #[arg(
            long,
            value_name = "THRESHOLD",
            help = "Exit 2 when the mean scenario score falls below this"
        )]
        fail_on: Option<f64>,

        #[arg(long, value_enum, default_value = "basic")]
        config: ConfigSet,
    },

    #[command(about = "List scenarios matching the filters")]
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },

    #[command(about = "Compute the random and always-reply baselines only")]
    Baselines {
        #[command(flatten)]
        filter: FilterArgs,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}
