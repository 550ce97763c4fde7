//! Hierarchical experiment configs and a file-lock work queue for
//! distributed parameter sweeps.
//!
//! Workers on separate hosts coordinate purely through marker files on a
//! shared filesystem: `generate` lays out numbered config directories,
//! `Runner::run_forever` claims and completes them one at a time, and the
//! CLI covers inspection and recovery.

pub mod cli;
pub mod config;
pub mod error;
pub mod queue;
pub mod storage;
pub mod sweep;

pub use config::{ConfigNode, ConfigValue, UsageField, UsageMode};
pub use error::{Result, SweepError};
pub use queue::{QueueConfig, Role, RunResult, Runner, ScanMode};
pub use storage::{LocalStorage, Storage};
