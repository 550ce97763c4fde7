//! Scan command: list work directories by state.

use crate::queue::{self, ScanMode};
use crate::storage::Storage;
use anyhow::Result;
use clap::{Args, ValueEnum};

/// Which work-directory states to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScanModeArg {
    /// Every directory containing a config (default)
    #[default]
    All,
    /// Unclaimed and unfinished
    Todo,
    /// Completed
    Finished,
    /// Currently claimed
    Locked,
}

impl From<ScanModeArg> for ScanMode {
    fn from(arg: ScanModeArg) -> Self {
        match arg {
            ScanModeArg::All => ScanMode::All,
            ScanModeArg::Todo => ScanMode::Todo,
            ScanModeArg::Finished => ScanMode::Finished,
            ScanModeArg::Locked => ScanMode::Locked,
        }
    }
}

/// Arguments for the scan command.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Prefix containing the work directories
    pub prefix: String,

    /// Which states to report
    #[arg(short, long, value_enum, default_value_t = ScanModeArg::All)]
    pub mode: ScanModeArg,

    /// Stop at the first match
    #[arg(long)]
    pub one: bool,
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs, storage: &dyn Storage) -> Result<()> {
    let mode = ScanMode::from(args.mode);
    if args.one {
        match queue::scan_one(storage, &args.prefix, mode)? {
            Some(dir) => println!("{dir}"),
            None => println!("(none)"),
        }
        return Ok(());
    }
    let dirs = queue::scan(storage, &args.prefix, mode)?;
    for dir in &dirs {
        println!("{dir}");
    }
    println!("{} matching", dirs.len());
    Ok(())
}
