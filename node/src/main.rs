// Copyright (c) 2026 Phoenix Vault Contributors. MIT License.
// See LICENSE for details.

//! # Phoenix Node
//!
//! Entry point for the `phoenix-node` binary. Parses CLI arguments,
//! initializes logging, and drives a vault through a scripted scenario.
//!
//! The binary supports two subcommands:
//!
//! - `replay`: run a JSON scenario and print one outcome line per step
//! - `version`: print build version information

mod cli;
mod logging;
mod scenario;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Commands, PhoenixNodeCli};

fn main() -> Result<()> {
    let cli = PhoenixNodeCli::parse();

    match cli.command {
        Commands::Replay(args) => {
            logging::init_logging(&cli.log, cli.log_format)?;
            run_replay(args)
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Loads the scenario, replays it, and reports to stdout.
fn run_replay(args: cli::ReplayArgs) -> Result<()> {
    tracing::info!(scenario = %args.scenario.display(), "replaying scenario");

    let scenario = scenario::load(&args.scenario)?;
    let replay = scenario::replay(&scenario)
        .with_context(|| format!("replay of {} aborted", args.scenario.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    scenario::write_report(&mut out, &replay, args.snapshot)?;
    out.flush().context("failed to flush stdout")?;
    Ok(())
}

/// Prints the binary version and the vault bounds it enforces.
fn print_version() {
    println!("phoenix-node {}", env!("CARGO_PKG_VERSION"));
    println!(
        "maturation delay {}..={} blocks",
        phoenix_vault::config::MIN_MATURATION_DELAY,
        phoenix_vault::config::MAX_MATURATION_DELAY
    );
}
