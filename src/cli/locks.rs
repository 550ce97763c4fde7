//! Clear-locks command: interactive recovery of stale lock tags.

use crate::queue::Runner;
use anyhow::Result;
use clap::Args;

/// Arguments for the clear-locks command.
#[derive(Args, Debug)]
pub struct ClearLocksArgs {
    /// Prefix containing the work directories
    pub prefix: String,
}

/// Run the clear-locks command. Prompts on stdin before mutating anything.
pub fn run_clear_locks(args: &ClearLocksArgs, runner: &Runner) -> Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    runner.clear_locks(&args.prefix, &mut input, &mut output)?;
    Ok(())
}
