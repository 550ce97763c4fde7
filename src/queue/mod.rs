//! Distributed work-queue protocol over a shared filesystem.
//!
//! A work directory holds `config.yaml` plus up to two marker files:
//! `lock.tag` while a worker runs it and `finished.tag` once it completed.
//! Workers coordinate exclusively through these side effects; there is no
//! central coordinator and no network protocol.

pub mod lock;
pub mod results;
pub mod runner;

pub use lock::{GlobalLock, Role};
pub use results::RunResult;
pub use runner::Runner;

use crate::error::{Result, SweepError};
use crate::storage::{Storage, join};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Input config of a work directory.
pub fn config_path(dir: &str) -> String {
    join(dir, "config.yaml")
}

/// Marker present while a worker runs the directory.
pub fn lock_tag_path(dir: &str) -> String {
    join(dir, "lock.tag")
}

/// Terminal marker: the directory completed and is never re-run.
pub fn finished_tag_path(dir: &str) -> String {
    join(dir, "finished.tag")
}

/// Unclaimed and unfinished: config present, no lock tag, no finished tag.
pub fn is_todo(storage: &dyn Storage, dir: &str) -> Result<bool> {
    Ok(storage.exists(&config_path(dir))?
        && !storage.exists(&lock_tag_path(dir))?
        && !storage.exists(&finished_tag_path(dir))?)
}

/// Completed: config and finished tag present, lock tag absent.
pub fn is_finished(storage: &dyn Storage, dir: &str) -> Result<bool> {
    Ok(storage.exists(&config_path(dir))?
        && storage.exists(&finished_tag_path(dir))?
        && !storage.exists(&lock_tag_path(dir))?)
}

/// Claimed: lock tag present.
pub fn is_locked(storage: &dyn Storage, dir: &str) -> Result<bool> {
    storage.exists(&lock_tag_path(dir))
}

/// Which work-directory states a scan reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Every directory containing a config.
    #[default]
    All,
    Todo,
    Finished,
    Locked,
}

impl FromStr for ScanMode {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(ScanMode::All),
            "todo" => Ok(ScanMode::Todo),
            "finished" => Ok(ScanMode::Finished),
            "locked" => Ok(ScanMode::Locked),
            other => Err(SweepError::contract(format!(
                "unknown scan mode '{other}' (expected all, todo, finished, or locked)"
            ))),
        }
    }
}

fn matches_mode(storage: &dyn Storage, dir: &str, mode: ScanMode) -> Result<bool> {
    match mode {
        ScanMode::All => Ok(true),
        ScanMode::Todo => is_todo(storage, dir),
        ScanMode::Finished => is_finished(storage, dir),
        ScanMode::Locked => is_locked(storage, dir),
    }
}

/// List the immediate subdirectories of `prefix` that contain a config and
/// match `mode`.
pub fn scan(storage: &dyn Storage, prefix: &str, mode: ScanMode) -> Result<Vec<String>> {
    let mut matched = Vec::new();
    for dir in storage.list(prefix)? {
        if !storage.exists(&config_path(&dir))? {
            continue;
        }
        if matches_mode(storage, &dir, mode)? {
            matched.push(dir);
        }
    }
    Ok(matched)
}

/// Fail-fast variant of [`scan`]: the first matching directory, if any.
pub fn scan_one(storage: &dyn Storage, prefix: &str, mode: ScanMode) -> Result<Option<String>> {
    for dir in storage.list(prefix)? {
        if !storage.exists(&config_path(&dir))? {
            continue;
        }
        if matches_mode(storage, &dir, mode)? {
            return Ok(Some(dir));
        }
    }
    Ok(None)
}

/// Protocol tuning knobs. The defaults reproduce the deployed cadence:
/// a 5–10 s randomized global-lock poll and a 60 s idle backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Location of the single global lock object.
    #[serde(default = "default_global_lock_url")]
    pub global_lock_url: String,

    /// Root under which persistent result directories are uploaded.
    #[serde(default = "default_persistent_root")]
    pub persistent_root: String,

    /// Minimum delay between global-lock polls, in milliseconds.
    #[serde(default = "default_poll_min_ms")]
    pub poll_min_ms: u64,

    /// Random extra delay added to each poll, in milliseconds.
    #[serde(default = "default_poll_jitter_ms")]
    pub poll_jitter_ms: u64,

    /// Sleep after a pass that found no todo directory, in milliseconds.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            global_lock_url: default_global_lock_url(),
            persistent_root: default_persistent_root(),
            poll_min_ms: default_poll_min_ms(),
            poll_jitter_ms: default_poll_jitter_ms(),
            idle_backoff_ms: default_idle_backoff_ms(),
        }
    }
}

fn default_global_lock_url() -> String {
    "/tmp/sweeprun/global.lock".to_string()
}

fn default_persistent_root() -> String {
    "/tmp/sweeprun/persistent".to_string()
}

fn default_poll_min_ms() -> u64 {
    5_000
}

fn default_poll_jitter_ms() -> u64 {
    5_000
}

fn default_idle_backoff_ms() -> u64 {
    60_000
}
