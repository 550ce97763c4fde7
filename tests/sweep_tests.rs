//! Integration tests for the parameter-sweep generator.

use serde_yaml::Value;
use std::fs;
use sweeprun::config::{UsageMode, load_with_mode};
use sweeprun::error::SweepError;
use sweeprun::storage::LocalStorage;
use sweeprun::sweep::{config_url, generate, next_free_id};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    base: String,
    search: String,
    output: String,
}

/// Base `{a: {x: 1, y: 2}}` with search space `{a: {x: [1, 2, 3]}}`.
fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let configs = temp.path().join("configs");
    fs::create_dir_all(&configs).unwrap();
    fs::write(configs.join("base.yaml"), "a:\n  x: 1\n  y: 2\n").unwrap();
    fs::write(configs.join("search.yaml"), "a:\n  x: [1, 2, 3]\n").unwrap();

    Fixture {
        base: configs.join("base").to_string_lossy().into_owned(),
        search: configs.join("search").to_string_lossy().into_owned(),
        output: temp.path().join("sweep").to_string_lossy().into_owned(),
        _temp: temp,
    }
}

fn load_output(storage: &LocalStorage, prefix: &str, id: usize) -> Value {
    load_with_mode(storage, &config_url(prefix, id), UsageMode::None)
        .unwrap()
        .to_value()
}

#[test]
fn test_dedup_caps_output_at_distinct_combinations() {
    let f = fixture();
    let storage = LocalStorage::new();

    // Only 3 distinct combinations exist, so 5 draws write at most 3.
    let written = generate(&storage, &f.base, &f.search, &f.output, 5, true).unwrap();
    assert!(written <= 3, "wrote {written} configs from 3 combinations");
    assert_eq!(next_free_id(&storage, &f.output).unwrap(), written);

    // Every output is the base with one chosen x; y always survives.
    let mut seen = Vec::new();
    for id in 0..written {
        let value = load_output(&storage, &f.output, id);
        let x = value["a"]["x"]
            .as_u64()
            .expect("x must be one of the candidates");
        assert!((1..=3).contains(&x));
        assert_eq!(value["a"]["y"], Value::from(2));
        assert!(!seen.contains(&value), "structural duplicate written");
        seen.push(value);
    }
}

#[test]
fn test_numbering_continues_past_existing_dirs() {
    let f = fixture();
    let storage = LocalStorage::new();

    let first = generate(&storage, &f.base, &f.search, &f.output, 2, true).unwrap();
    assert!(first >= 1);
    let second = generate(&storage, &f.base, &f.search, &f.output, 10, true).unwrap();

    // Across both runs the distinct combinations still cap the total.
    let total = first + second;
    assert!(total <= 3, "total {total} exceeds the 3 distinct combinations");
    assert_eq!(next_free_id(&storage, &f.output).unwrap(), total);
}

#[test]
fn test_no_dedup_writes_every_draw() {
    let f = fixture();
    let storage = LocalStorage::new();

    let written = generate(&storage, &f.base, &f.search, &f.output, 5, false).unwrap();
    assert_eq!(written, 5);
    assert_eq!(next_free_id(&storage, &f.output).unwrap(), 5);
}

#[test]
fn test_search_key_missing_from_base_is_contract_violation() {
    let f = fixture();
    let storage = LocalStorage::new();
    let configs = std::path::Path::new(&f.search).parent().unwrap();
    fs::write(
        configs.join("bad_search.yaml"),
        "a:\n  z: [1, 2]\n",
    )
    .unwrap();
    let bad = configs.join("bad_search").to_string_lossy().into_owned();

    let err = generate(&storage, &f.base, &bad, &f.output, 1, true).unwrap_err();
    assert!(matches!(err, SweepError::ContractViolation(_)));
    assert!(err.to_string().contains("a.z"));
}

#[test]
fn test_non_sequence_search_value_is_contract_violation() {
    let f = fixture();
    let storage = LocalStorage::new();
    let configs = std::path::Path::new(&f.search).parent().unwrap();
    fs::write(configs.join("scalar_search.yaml"), "a:\n  x: 1\n").unwrap();
    let bad = configs.join("scalar_search").to_string_lossy().into_owned();

    let err = generate(&storage, &f.base, &bad, &f.output, 1, true).unwrap_err();
    assert!(matches!(err, SweepError::ContractViolation(_)));
}
