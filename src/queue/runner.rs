//! Claim-run-finish worker loop and operator tools.

use crate::config::loader::load;
use crate::config::node::ConfigNode;
use crate::error::SweepError;
use crate::queue::lock::{GlobalLock, Role};
use crate::queue::results::{RunResult, persist};
use crate::queue::{
    QueueConfig, ScanMode, config_path, finished_tag_path, lock_tag_path, scan, scan_one,
};
use crate::storage::{Storage, join};
use anyhow::Result;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::time::Duration;
use tracing::{info, warn};

/// One worker process's view of the queue.
///
/// The worker is single-threaded and blocking: every storage call is
/// synchronous, and the only waits are the global-lock poll and the idle
/// backoff. Termination is abrupt; there is no cancellation channel.
pub struct Runner<'a> {
    storage: &'a dyn Storage,
    config: QueueConfig,
    role: Role,
}

impl<'a> Runner<'a> {
    pub fn new(storage: &'a dyn Storage, config: QueueConfig, role: Role) -> Self {
        Self {
            storage,
            config,
            role,
        }
    }

    /// Claim one todo directory, run the work function on its config, and
    /// persist the outcome. Returns the completed directory, or `None` when
    /// no todo directory existed.
    ///
    /// The claim is arbitrated through the global lock: acquire, select the
    /// first todo, write its `lock.tag`, release. The lock is released on
    /// every path out of the claim step, including the empty-queue one. If
    /// the work function fails, the directory keeps its `lock.tag` and must
    /// be recovered with [`Runner::clear_locks`].
    pub fn run_once<F>(&self, prefix: &str, work: &mut F) -> Result<Option<String>>
    where
        F: FnMut(ConfigNode) -> Result<RunResult>,
    {
        let lock = GlobalLock::new(self.storage, &self.config, self.role);
        lock.acquire()?;
        let claimed = match scan_one(self.storage, prefix, ScanMode::Todo) {
            Ok(found) => {
                if let Some(ref dir) = found {
                    self.storage.write(&lock_tag_path(dir), "Running")?;
                }
                found
            }
            Err(err) => {
                lock.release()?;
                return Err(err.into());
            }
        };
        lock.release()?;

        let Some(dir) = claimed else {
            info!(prefix = %prefix, "no todo directory found");
            return Ok(None);
        };

        info!(dir = %dir, "running work directory");
        let config = load(self.storage, &config_path(&dir))?;
        let result = work(config)?;
        persist(self.storage, &self.config, &dir, &result)?;

        self.storage.remove(&lock_tag_path(&dir), false)?;
        self.storage.write(&finished_tag_path(&dir), "Finished")?;
        info!(dir = %dir, "work directory finished");
        Ok(Some(dir))
    }

    /// Run until terminated, sleeping `idle_backoff_ms` after every pass
    /// that found nothing to do.
    pub fn run_forever<F>(&self, prefix: &str, mut work: F) -> Result<()>
    where
        F: FnMut(ConfigNode) -> Result<RunResult>,
    {
        loop {
            if self.run_once(prefix, &mut work)?.is_none() {
                std::thread::sleep(Duration::from_millis(self.config.idle_backoff_ms));
            }
        }
    }

    /// Interactive recovery for directories left locked by crashed workers.
    ///
    /// Leader-only. Shows the affected directories and removes their lock
    /// tags only after an explicit `Y` from the interactive stream. Finished
    /// tags are never touched. Returns the number of locks cleared.
    pub fn clear_locks(
        &self,
        prefix: &str,
        input: &mut dyn BufRead,
        output: &mut dyn Write,
    ) -> Result<usize> {
        if self.role != Role::Leader {
            warn!("clear-locks is leader-only; nothing done");
            return Ok(0);
        }
        let locked = scan(self.storage, prefix, ScanMode::Locked)?;
        if locked.is_empty() {
            writeln!(output, "No locked directories under {prefix}")?;
            return Ok(0);
        }
        writeln!(output, "Locked directories:")?;
        for dir in &locked {
            writeln!(output, "  {dir}")?;
        }
        write!(output, "Clear locks? (Y): ")?;
        output.flush()?;

        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if answer.trim() != "Y" {
            writeln!(output, "Keeping locks")?;
            return Ok(0);
        }
        for dir in &locked {
            self.storage.remove(&lock_tag_path(dir), false)?;
        }
        writeln!(output, "Cleared {} lock(s)", locked.len())?;
        info!(count = locked.len(), prefix = %prefix, "stale locks cleared");
        Ok(locked.len())
    }
}

/// Metrics and config of one finished work directory.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub dir: String,
    pub metrics: serde_yaml::Value,
    pub config: serde_yaml::Value,
}

/// Collect metrics and configs of every finished directory under `prefix`.
pub fn summarize(storage: &dyn Storage, prefix: &str) -> Result<Vec<RunSummary>> {
    let mut summaries = Vec::new();
    for dir in scan(storage, prefix, ScanMode::Finished)? {
        let metrics_url = join(&dir, "metrics.yaml");
        let metrics_text = storage.read_to_string(&metrics_url)?;
        let metrics = serde_yaml::from_str(&metrics_text)
            .map_err(|e| SweepError::yaml(metrics_url.as_str(), e))?;

        let config_url = config_path(&dir);
        let config_text = storage.read_to_string(&config_url)?;
        let config = serde_yaml::from_str(&config_text)
            .map_err(|e| SweepError::yaml(config_url.as_str(), e))?;

        summaries.push(RunSummary {
            dir,
            metrics,
            config,
        });
    }
    Ok(summaries)
}
