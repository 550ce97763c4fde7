//! Show command: print the merged view of a composite config path.

use crate::config::{UsageMode, load_with_mode};
use crate::storage::Storage;
use anyhow::Result;
use clap::Args;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Composite config path: <dir>/<base>[+<overlay>][-<filter>][.yaml]
    pub path: String,
}

/// Run the show command.
pub fn run_show(args: &ShowArgs, storage: &dyn Storage) -> Result<()> {
    let config = load_with_mode(storage, &args.path, UsageMode::None)?;
    print!("{}", config.render());
    Ok(())
}
