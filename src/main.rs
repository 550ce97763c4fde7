//! sweeprun CLI
//!
//! Generates parameter-sweep configs and drives the file-lock work queue
//! that distributes them across workers sharing a filesystem.

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use sweeprun::cli::generate::run_generate;
use sweeprun::cli::locks::run_clear_locks;
use sweeprun::cli::scan::run_scan;
use sweeprun::cli::show::run_show;
use sweeprun::cli::summarize::run_summarize;
use sweeprun::cli::{Cli, Command};
use sweeprun::queue::{QueueConfig, Role, Runner};
use sweeprun::storage::LocalStorage;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli)?;

    let storage = LocalStorage::new();
    let mut queue_config = QueueConfig::default();
    if let Some(ref url) = cli.global_lock {
        queue_config.global_lock_url = url.clone();
    }
    if let Some(ref root) = cli.persistent_root {
        queue_config.persistent_root = root.clone();
    }
    let role = Role::from(cli.role);

    match &cli.command {
        Command::Show(args) => run_show(args, &storage),
        Command::Generate(args) => run_generate(args, &storage),
        Command::Scan(args) => run_scan(args, &storage),
        Command::Summarize(args) => run_summarize(args, &storage),
        Command::ClearLocks(args) => {
            let runner = Runner::new(&storage, queue_config, role);
            run_clear_locks(args, &runner)
        }
    }
}

/// Route tracing output per the `--log` flag: off, stdout, stderr, or an
/// append-mode file.
fn setup_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    match cli.log.as_str() {
        "0" | "off" => {}
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}
