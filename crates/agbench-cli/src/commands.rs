use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::args::{Cli, Commands};
use crate::handlers;

pub fn run(cli: Cli) -> Result<i32> {
    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(0);
    };

    init_tracing(cli.log_level.as_filter());

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;

    match command {
        Commands::Run {
            filter,
            scale,
            trials,
            seed,
            model,
            provider,
            concurrency,
            mock,
            fail_on,
            config,
        } => runtime.block_on(handlers::run::handle(
            &cli.output,
            filter,
            scale,
            trials,
            seed,
            model,
            provider,
            concurrency,
            mock,
            fail_on,
            config,
        )),

        Commands::List { filter } => handlers::list::handle(filter),

        Commands::Baselines { filter, seed } => handlers::baselines::handle(filter, seed),
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // Logs go to stderr so stdout stays parseable (list/baselines output).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
