//! Generate command: draw randomized sweep configs from a search space.

use crate::storage::Storage;
use crate::sweep;
use anyhow::Result;
use clap::Args;

/// Arguments for the generate command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Composite path of the base config
    #[arg(short, long)]
    pub base: String,

    /// Composite path of the search-space config (every leaf a sequence of
    /// candidate values)
    #[arg(short, long)]
    pub search: String,

    /// Output prefix for numbered config directories
    #[arg(short, long)]
    pub output: String,

    /// Number of draws to attempt
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,

    /// Keep structural duplicates instead of skipping them
    #[arg(long)]
    pub no_dedup: bool,
}

/// Run the generate command.
pub fn run_generate(args: &GenerateArgs, storage: &dyn Storage) -> Result<()> {
    let written = sweep::generate(
        storage,
        &args.base,
        &args.search,
        &args.output,
        args.count,
        !args.no_dedup,
    )?;
    println!("Generated {} config(s) under {}", written, args.output);
    Ok(())
}
