//! Driftcert CLI: the `driftcert` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Diff {
            golden,
            candidate,
            policy,
            context,
            environment,
            json,
            enforce,
        } => commands::diff::run(commands::diff::Args {
            golden,
            candidate,
            policy,
            context,
            environment,
            json,
            enforce,
        }),

        Commands::Score { input, json } => commands::score::run(input, json),

        Commands::PolicyCheck { policy, json } => commands::policy_check::run(policy, json),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
