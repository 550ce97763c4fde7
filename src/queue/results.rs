//! Result records persisted per work directory.

use crate::error::{Result, SweepError};
use crate::queue::QueueConfig;
use crate::storage::{Storage, join};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;

/// Outcome of one work-function run.
///
/// The record is self-describing JSON: a required `metrics` mapping, an
/// optional local directory to publish, and any free-form extra fields the
/// work function wants preserved alongside them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResult {
    /// Scalar metrics of the run, also extracted to `metrics.yaml`.
    pub metrics: Map<String, Value>,

    /// Local directory to upload to the persistent root. The local copy is
    /// deleted after upload and replaced by a pointer file in the work
    /// directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_dir: Option<PathBuf>,

    /// Free-form additional fields, stored inline in the record.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl RunResult {
    pub fn new(metrics: Map<String, Value>) -> Self {
        Self {
            metrics,
            persistent_dir: None,
            extra: Map::new(),
        }
    }
}

/// Persist a run's outcome into its work directory: the full record as
/// `results.json`, the metrics alone as `metrics.yaml`, and the optional
/// persistent directory uploaded to a timestamped location under the
/// configured persistent root (leaving `persistent_dir_link.txt` behind).
pub fn persist(
    storage: &dyn Storage,
    config: &QueueConfig,
    dir: &str,
    result: &RunResult,
) -> Result<()> {
    let record = serde_json::to_string_pretty(result)?;
    storage.write(&join(dir, "results.json"), &record)?;

    let metrics = serde_yaml::to_string(&result.metrics)
        .map_err(|e| SweepError::yaml(join(dir, "metrics.yaml"), e))?;
    storage.write(&join(dir, "metrics.yaml"), &metrics)?;

    if let Some(ref local) = result.persistent_dir {
        let stamp = Utc::now().format("%Y/%m/%d_%H_%M_%S").to_string();
        let remote = join(&config.persistent_root, &stamp);
        storage.upload(local, &remote)?;
        std::fs::remove_dir_all(local)
            .map_err(|e| SweepError::storage(local.to_string_lossy(), e))?;
        storage.write(&join(dir, "persistent_dir_link.txt"), &remote)?;
        info!(local = %local.display(), remote = %remote, "persistent dir uploaded, local copy deleted");
    }

    Ok(())
}
