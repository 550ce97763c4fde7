//! Randomized parameter-sweep generation.
//!
//! A search-space config mirrors the base config's shape, except every leaf
//! holds a sequence of candidate values for that dotted key. Each draw picks
//! one candidate per key uniformly at random and persists the recovered
//! nested config to the next numbered output directory.

use crate::config::loader::load_with_mode;
use crate::config::node::{ConfigNode, ConfigValue, UsageMode};
use crate::error::{Result, SweepError};
use crate::storage::{Storage, join};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_yaml::Value;
use tracing::info;

/// Url of the config file of numbered output directory `id`.
pub fn config_url(prefix: &str, id: usize) -> String {
    join(&join(prefix, &id.to_string()), "config.yaml")
}

/// First id with no `<prefix>/<id>/config.yaml`. Numbering is contiguous
/// from zero, so the first gap is the next slot.
pub fn next_free_id(storage: &dyn Storage, prefix: &str) -> Result<usize> {
    let mut id = 0;
    while storage.exists(&config_url(prefix, id))? {
        id += 1;
    }
    Ok(id)
}

/// Generate up to `count` randomized config variants under `output_prefix`.
///
/// Returns the number of configs actually written. With `check_duplicate`
/// set, draws that are structurally equal to any previously generated or
/// pre-existing config are skipped; a skipped draw consumes one of the
/// `count` attempts but not an output slot.
pub fn generate(
    storage: &dyn Storage,
    base_config_path: &str,
    search_config_path: &str,
    output_prefix: &str,
    count: usize,
    check_duplicate: bool,
) -> Result<usize> {
    generate_with_rng(
        storage,
        base_config_path,
        search_config_path,
        output_prefix,
        count,
        check_duplicate,
        &mut rand::thread_rng(),
    )
}

/// [`generate`] with an injected random source.
pub fn generate_with_rng(
    storage: &dyn Storage,
    base_config_path: &str,
    search_config_path: &str,
    output_prefix: &str,
    count: usize,
    check_duplicate: bool,
    rng: &mut impl Rng,
) -> Result<usize> {
    let base = load_with_mode(storage, base_config_path, UsageMode::Count)?;
    let search = load_with_mode(storage, search_config_path, UsageMode::Count)?;
    let flat_base = base.flatten();
    let flat_search = search.flatten();

    let mut candidates: Vec<(String, Vec<Value>)> = Vec::new();
    for (key, value) in flat_search.iter() {
        let seq = match value {
            ConfigValue::Leaf(Value::Sequence(seq)) => seq.clone(),
            _ => {
                return Err(SweepError::contract(format!(
                    "search key '{key}' must hold a sequence of candidate values"
                )));
            }
        };
        if !flat_base.contains_key(key) {
            return Err(SweepError::contract(format!(
                "search key '{key}' is missing from the base config"
            )));
        }
        if seq.is_empty() {
            return Err(SweepError::contract(format!(
                "search key '{key}' has no candidate values"
            )));
        }
        candidates.push((key.to_string(), seq));
    }

    let start_id = next_free_id(storage, output_prefix)?;
    let mut existing: Vec<ConfigNode> = Vec::with_capacity(start_id);
    for id in 0..start_id {
        existing.push(load_with_mode(
            storage,
            &config_url(output_prefix, id),
            UsageMode::Count,
        )?);
    }

    let mut file_id = start_id;
    let mut written = 0;
    for _ in 0..count {
        let mut draw = flat_base.copy();
        for (key, seq) in &candidates {
            if let Some(choice) = seq.choose(&mut *rng) {
                draw.set(key.clone(), choice.clone());
            }
        }
        let candidate = draw.unflatten();
        if check_duplicate && existing.iter().any(|c| c == &candidate) {
            continue;
        }
        candidate.save(storage, &config_url(output_prefix, file_id))?;
        existing.push(candidate);
        file_id += 1;
        written += 1;
    }

    info!(written, requested = count, prefix = %output_prefix, "generated sweep configs");
    Ok(written)
}
