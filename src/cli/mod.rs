//! CLI command definitions for sweeprun
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod generate;
pub mod locks;
pub mod scan;
pub mod show;
pub mod summarize;

use crate::queue::Role;
use clap::{Parser, Subcommand, ValueEnum};
use generate::GenerateArgs;
use locks::ClearLocksArgs;
use scan::ScanArgs;
use show::ShowArgs;
use summarize::SummarizeArgs;

/// Role of this process in its worker group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RoleArg {
    /// Arbitrates claims through the global lock (default)
    #[default]
    Leader,
    /// Externally synchronized with a leader; skips global-lock steps
    Worker,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Leader => Role::Leader,
            RoleArg::Worker => Role::Worker,
        }
    }
}

/// Parameter-sweep config generator and work-queue tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Location of the global lock object
    #[arg(long, global = true)]
    pub global_lock: Option<String>,

    /// Root for persistent result-directory uploads
    #[arg(long, global = true)]
    pub persistent_root: Option<String>,

    /// Role of this process in its worker group
    #[arg(long, value_enum, default_value_t = RoleArg::Leader, global = true)]
    pub role: RoleArg,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged view of a composite config path
    Show(ShowArgs),

    /// Generate randomized sweep configs from a search space
    Generate(GenerateArgs),

    /// List work directories by state
    Scan(ScanArgs),

    /// Show metrics and configs of finished runs
    Summarize(SummarizeArgs),

    /// Interactively clear stale lock tags left by crashed workers
    ClearLocks(ClearLocksArgs),
}
