// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff - professional hand-off and escalation service.
//!
//! This is the binary entry point. `serve` runs the timeout and inactivity
//! sweeps on a schedule; the other subcommands are one-shot operator tools.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod notifier;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use handoff_config::HandoffConfig;
use tracing::error;

/// Handoff - professional hand-off and escalation service.
#[derive(Parser, Debug)]
#[command(name = "handoff", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the XDG lookup.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the timeout and inactivity sweeps until SIGINT or SIGTERM.
    Serve,
    /// Run one sweep and print its report.
    Sweep {
        #[arg(value_enum)]
        kind: SweepTarget,
    },
    /// Rank the professionals who could take a session in a role.
    Match {
        role_id: String,
        /// Preferred location (case-insensitive substring).
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        min_rating: Option<f64>,
        /// Only consider professionals who are online now.
        #[arg(long)]
        online_only: bool,
        /// Professional to leave out; repeatable.
        #[arg(long = "exclude")]
        excluded: Vec<String>,
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// Evaluate the escalation rules for a session right now.
    Evaluate { session_id: String },
    /// Validate the configuration and exit.
    CheckConfig,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SweepTarget {
    Timeout,
    Inactivity,
}

fn load_config(path: Option<&PathBuf>) -> HandoffConfig {
    let loaded = match path {
        Some(path) => handoff_config::load_and_validate_path(path),
        None => handoff_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            handoff_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Sweep { kind }) => {
            serve::init_tracing(&config.service.log_level);
            commands::run_sweep(config, kind).await
        }
        Some(Commands::Match {
            role_id,
            location,
            min_rating,
            online_only,
            excluded,
            limit,
        }) => {
            serve::init_tracing(&config.service.log_level);
            let query = commands::MatchQuery {
                role_id,
                location,
                min_rating,
                online_only,
                excluded,
                limit,
            };
            commands::run_match(config, query).await
        }
        Some(Commands::Evaluate { session_id }) => {
            serve::init_tracing(&config.service.log_level);
            commands::run_evaluate(config, &session_id).await
        }
        Some(Commands::CheckConfig) => {
            commands::print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("handoff: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
