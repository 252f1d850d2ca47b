//! # CLI Interface
//!
//! Command-line structure for `phoenix-node`, built with `clap` derive.
//! Two subcommands: `replay` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Phoenix Vault scenario driver.
///
/// Replays a scripted sequence of calls against a fresh vault and reports
/// the outcome of each one as a JSON line on stdout.
#[derive(Parser, Debug)]
#[command(
    name = "phoenix-node",
    about = "Phoenix Vault scenario driver",
    version,
    propagate_version = true
)]
pub struct PhoenixNodeCli {
    /// Log filter directives, overridden by `RUST_LOG` when set.
    #[arg(
        long,
        global = true,
        env = "PHOENIX_LOG",
        default_value = "phoenix_node=info,phoenix_vault=info"
    )]
    pub log: String,

    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "PHOENIX_LOG_FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSON scenario file against a new vault.
    Replay(ReplayArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Path to the scenario file.
    pub scenario: PathBuf,

    /// Print the final vault state as one more JSON line.
    #[arg(long)]
    pub snapshot: bool,
}
