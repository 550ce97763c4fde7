//! Summarize command: metrics and configs of finished runs.

use crate::queue::runner::summarize;
use crate::storage::Storage;
use anyhow::Result;
use clap::Args;

/// Arguments for the summarize command.
#[derive(Args, Debug)]
pub struct SummarizeArgs {
    /// Prefix containing the work directories
    pub prefix: String,

    /// Emit the summaries as a JSON array instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the summarize command.
pub fn run_summarize(args: &SummarizeArgs, storage: &dyn Storage) -> Result<()> {
    let summaries = summarize(storage, &args.prefix)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    for (i, summary) in summaries.iter().enumerate() {
        println!("[{i}] {}", summary.dir);
        println!("  metrics: {}", serde_json::to_string(&summary.metrics)?);
        println!("  config:  {}", serde_json::to_string(&summary.config)?);
    }
    println!("{} finished run(s)", summaries.len());
    Ok(())
}
