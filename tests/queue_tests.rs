//! Integration tests for the distributed work-queue protocol.
//!
//! Drives real work directories through todo -> locked -> finished with a
//! `Runner` over local storage, including crash recovery via the
//! interactive lock-clearing tool.

use serde_json::json;
use std::io::Cursor;
use sweeprun::config::ConfigNode;
use sweeprun::queue::{self, QueueConfig, Role, RunResult, Runner, ScanMode, runner::summarize};
use sweeprun::storage::{LocalStorage, Storage, join};
use tempfile::TempDir;

fn queue_config(temp: &TempDir) -> QueueConfig {
    QueueConfig {
        global_lock_url: temp
            .path()
            .join("global.lock")
            .to_string_lossy()
            .into_owned(),
        persistent_root: temp.path().join("persist").to_string_lossy().into_owned(),
        poll_min_ms: 1,
        poll_jitter_ms: 1,
        idle_backoff_ms: 1,
    }
}

fn work_prefix(temp: &TempDir) -> String {
    temp.path().join("work").to_string_lossy().into_owned()
}

fn seed_todo(storage: &LocalStorage, prefix: &str, name: &str) -> String {
    let dir = join(prefix, name);
    storage
        .write(&queue::config_path(&dir), "a:\n  x: 1\n  y: 2\n")
        .unwrap();
    dir
}

fn loss_result(loss: f64) -> RunResult {
    let mut result = RunResult::default();
    result.metrics.insert("loss".to_string(), json!(loss));
    result
}

#[test]
fn test_claim_run_finish_transitions() {
    let temp = TempDir::new().unwrap();
    let storage = LocalStorage::new();
    let prefix = work_prefix(&temp);
    let config = queue_config(&temp);

    let dir0 = seed_todo(&storage, &prefix, "0");
    let dir1 = seed_todo(&storage, &prefix, "1");

    let runner = Runner::new(&storage, config.clone(), Role::Leader);
    let mut work = |mut c: ConfigNode| -> anyhow::Result<RunResult> {
        // Mid-run: exactly one directory is locked, never two states at
        // once, and the global lock is already released.
        let locked = queue::scan(&storage, &prefix, ScanMode::Locked)?;
        assert_eq!(locked.len(), 1);
        assert!(!queue::is_todo(&storage, &locked[0])?);
        assert!(!queue::is_finished(&storage, &locked[0])?);
        assert!(!storage.exists(&config.global_lock_url)?);

        let x = c.child("a")?.leaf("x")?.as_u64().unwrap_or(0);
        Ok(loss_result(1.0 / x as f64))
    };

    let first = runner.run_once(&prefix, &mut work).unwrap();
    assert_eq!(first.as_deref(), Some(dir0.as_str()));
    assert!(queue::is_finished(&storage, &dir0).unwrap());
    assert!(!queue::is_locked(&storage, &dir0).unwrap());
    assert!(storage.exists(&join(&dir0, "results.json")).unwrap());
    assert!(storage.exists(&join(&dir0, "metrics.yaml")).unwrap());

    // A finished directory never reappears in todo or locked scans.
    assert_eq!(
        queue::scan(&storage, &prefix, ScanMode::Todo).unwrap(),
        vec![dir1.clone()]
    );
    assert!(
        queue::scan(&storage, &prefix, ScanMode::Locked)
            .unwrap()
            .is_empty()
    );

    let second = runner.run_once(&prefix, &mut work).unwrap();
    assert_eq!(second.as_deref(), Some(dir1.as_str()));

    // Empty queue: no claim, and the global lock is not left behind.
    let idle = runner.run_once(&prefix, &mut work).unwrap();
    assert_eq!(idle, None);
    assert!(!storage.exists(&config.global_lock_url).unwrap());
}

#[test]
fn test_failed_work_leaves_lock_for_operator_recovery() {
    let temp = TempDir::new().unwrap();
    let storage = LocalStorage::new();
    let prefix = work_prefix(&temp);
    let config = queue_config(&temp);

    let dir = seed_todo(&storage, &prefix, "0");
    let runner = Runner::new(&storage, config, Role::Leader);

    let mut failing =
        |_c: ConfigNode| -> anyhow::Result<RunResult> { anyhow::bail!("worker crashed") };
    let err = runner.run_once(&prefix, &mut failing).unwrap_err();
    assert!(err.to_string().contains("worker crashed"));

    // The directory stays locked; nothing auto-recovers it.
    assert!(queue::is_locked(&storage, &dir).unwrap());
    assert!(
        queue::scan(&storage, &prefix, ScanMode::Todo)
            .unwrap()
            .is_empty()
    );

    // Declining the prompt keeps the lock.
    let mut output = Vec::new();
    let cleared = runner
        .clear_locks(&prefix, &mut Cursor::new(b"n\n".as_slice()), &mut output)
        .unwrap();
    assert_eq!(cleared, 0);
    assert!(queue::is_locked(&storage, &dir).unwrap());
    let shown = String::from_utf8(output).unwrap();
    assert!(shown.contains(&dir));

    // Confirming clears it back to todo.
    let mut output = Vec::new();
    let cleared = runner
        .clear_locks(&prefix, &mut Cursor::new(b"Y\n".as_slice()), &mut output)
        .unwrap();
    assert_eq!(cleared, 1);
    assert!(queue::is_todo(&storage, &dir).unwrap());
}

#[test]
fn test_clear_locks_is_leader_only() {
    let temp = TempDir::new().unwrap();
    let storage = LocalStorage::new();
    let prefix = work_prefix(&temp);
    let config = queue_config(&temp);

    let dir = seed_todo(&storage, &prefix, "0");
    storage.write(&queue::lock_tag_path(&dir), "Running").unwrap();

    let runner = Runner::new(&storage, config, Role::Worker);
    let mut output = Vec::new();
    let cleared = runner
        .clear_locks(&prefix, &mut Cursor::new(b"Y\n".as_slice()), &mut output)
        .unwrap();
    assert_eq!(cleared, 0);
    assert!(queue::is_locked(&storage, &dir).unwrap());
}

#[test]
fn test_persistent_dir_uploaded_through_runner() {
    let temp = TempDir::new().unwrap();
    let storage = LocalStorage::new();
    let prefix = work_prefix(&temp);
    let config = queue_config(&temp);

    let dir = seed_todo(&storage, &prefix, "0");
    let local = temp.path().join("scratch");

    let runner = Runner::new(&storage, config.clone(), Role::Leader);
    let mut work = |_c: ConfigNode| -> anyhow::Result<RunResult> {
        std::fs::create_dir_all(&local)?;
        std::fs::write(local.join("model.bin"), "weights")?;
        let mut result = loss_result(0.5);
        result.persistent_dir = Some(local.clone());
        Ok(result)
    };
    runner.run_once(&prefix, &mut work).unwrap();

    assert!(!local.exists());
    let link = storage
        .read_to_string(&join(&dir, "persistent_dir_link.txt"))
        .unwrap();
    assert!(link.starts_with(&config.persistent_root));
    assert_eq!(
        storage.read_to_string(&join(&link, "model.bin")).unwrap(),
        "weights"
    );
}

#[test]
fn test_summarize_reports_finished_runs() {
    let temp = TempDir::new().unwrap();
    let storage = LocalStorage::new();
    let prefix = work_prefix(&temp);
    let config = queue_config(&temp);

    seed_todo(&storage, &prefix, "0");
    seed_todo(&storage, &prefix, "1");

    let runner = Runner::new(&storage, config, Role::Leader);
    let mut losses = vec![0.3, 0.7].into_iter();
    let mut work = |_c: ConfigNode| -> anyhow::Result<RunResult> {
        Ok(loss_result(losses.next().unwrap_or(0.0)))
    };
    while runner.run_once(&prefix, &mut work).unwrap().is_some() {}

    let summaries = summarize(&storage, &prefix).unwrap();
    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert!(summary.metrics.get("loss").is_some());
        assert_eq!(
            summary.config,
            serde_yaml::from_str::<serde_yaml::Value>("{a: {x: 1, y: 2}}").unwrap()
        );
    }
}
