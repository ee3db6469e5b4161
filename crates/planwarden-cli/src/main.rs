//! Planwarden CLI: the `planwarden` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();

    match cli.command {
        Commands::Validate {
            plan,
            policy,
            script,
            libs,
            max_operations,
            json,
        } => commands::validate::run(commands::validate::Args {
            plan,
            policy,
            script,
            libs,
            max_operations,
            json,
        }),

        Commands::Inspect { plan, json } => commands::inspect::run(plan, json),

        Commands::Modules { json } => commands::modules::run(json),
    }
}
