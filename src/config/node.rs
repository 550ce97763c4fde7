//! Hierarchical config container with per-leaf usage accounting.
//!
//! A [`ConfigNode`] wraps a nested YAML mapping into a tree of nodes whose
//! leaf reads are counted (and, in `hist` mode, attributed to their call
//! sites). Flatten/unflatten convert between the nested shape and a single
//! level of dotted keys, which is what the sweep generator operates on.

use crate::config::merge::deep_merge;
use crate::error::{Result, SweepError};
use crate::storage::Storage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::panic::Location;
use std::str::FromStr;

/// How leaf reads are tracked. Fixed at construction and inherited by every
/// child node created from a nested mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMode {
    /// No tracking.
    None,
    /// Count reads per leaf key.
    #[default]
    Count,
    /// Count reads and record the caller location of each.
    Hist,
}

impl FromStr for UsageMode {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(UsageMode::None),
            "count" => Ok(UsageMode::Count),
            "hist" => Ok(UsageMode::Hist),
            other => Err(SweepError::InvalidUsageMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for UsageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsageMode::None => write!(f, "none"),
            UsageMode::Count => write!(f, "count"),
            UsageMode::Hist => write!(f, "hist"),
        }
    }
}

/// The call site of a leaf read, captured from the compiler-supplied caller
/// location rather than any runtime stack inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSite {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl AccessSite {
    fn from_location(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }

    /// `file:line:column` form used in usage snapshots.
    pub fn label(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Per-leaf usage accounting. Exists for leaf keys only, never for keys
/// holding nested nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub count: u64,
    pub hist: Vec<AccessSite>,
}

/// Which usage field a snapshot reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageField {
    Count,
    Hist,
}

/// A value held at a config key: either a scalar/sequence leaf or a nested
/// node, never both.
#[derive(Debug, PartialEq)]
pub enum ConfigValue {
    Leaf(Value),
    Node(ConfigNode),
}

impl ConfigValue {
    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            ConfigValue::Leaf(value) => Some(value),
            ConfigValue::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&ConfigNode> {
        match self {
            ConfigValue::Leaf(_) => None,
            ConfigValue::Node(node) => Some(node),
        }
    }
}

/// Ordered tree of config keys with attribute-style access semantics.
///
/// Keys keep insertion order. Equality is structural and ignores usage
/// state; the type system restricts comparison to other `ConfigNode`s.
#[derive(Debug)]
pub struct ConfigNode {
    entries: IndexMap<String, ConfigValue>,
    usage: IndexMap<String, UsageRecord>,
    mode: UsageMode,
}

impl ConfigNode {
    /// Recursively wrap a nested mapping. Every nested mapping becomes a
    /// child node inheriting `mode`; everything else becomes a leaf with a
    /// fresh zeroed usage record.
    pub fn new(mapping: Mapping, mode: UsageMode) -> Self {
        let mut node = ConfigNode {
            entries: IndexMap::new(),
            usage: IndexMap::new(),
            mode,
        };
        for (key, value) in mapping {
            let key = key_string(&key);
            match value {
                Value::Mapping(child) => {
                    node.entries
                        .insert(key, ConfigValue::Node(ConfigNode::new(child, mode)));
                }
                other => {
                    node.usage.insert(key.clone(), UsageRecord::default());
                    node.entries.insert(key, ConfigValue::Leaf(other));
                }
            }
        }
        node
    }

    /// Wrap a parsed YAML value whose root must be a mapping.
    pub fn from_value(value: Value, mode: UsageMode) -> Result<Self> {
        match value {
            Value::Mapping(mapping) => Ok(ConfigNode::new(mapping, mode)),
            other => Err(SweepError::contract(format!(
                "config document root must be a mapping, got {}",
                value_kind(&other)
            ))),
        }
    }

    pub fn mode(&self) -> UsageMode {
        self.mode
    }

    /// Look up a key. Reading a leaf updates its usage record according to
    /// the node's mode; reading a nested node never does.
    #[track_caller]
    pub fn get(&mut self, key: &str) -> Result<&ConfigValue> {
        let site = Location::caller();
        let is_leaf = match self.entries.get(key) {
            None => return Err(SweepError::key_not_found(key)),
            Some(ConfigValue::Leaf(_)) => true,
            Some(ConfigValue::Node(_)) => false,
        };
        if is_leaf {
            match self.mode {
                UsageMode::None => {}
                UsageMode::Count => {
                    if let Some(record) = self.usage.get_mut(key) {
                        record.count += 1;
                    }
                }
                UsageMode::Hist => {
                    if let Some(record) = self.usage.get_mut(key) {
                        record.count += 1;
                        record.hist.push(AccessSite::from_location(site));
                    }
                }
            }
        }
        self.entries
            .get(key)
            .ok_or_else(|| SweepError::key_not_found(key))
    }

    /// Read a leaf value, updating usage. Nested nodes at `key` are a
    /// contract violation.
    #[track_caller]
    pub fn leaf(&mut self, key: &str) -> Result<&Value> {
        match self.get(key)? {
            ConfigValue::Leaf(value) => Ok(value),
            ConfigValue::Node(_) => Err(SweepError::contract(format!(
                "key '{key}' holds a nested config, not a leaf"
            ))),
        }
    }

    /// Descend into a nested node. Never updates usage.
    pub fn child(&mut self, key: &str) -> Result<&mut ConfigNode> {
        match self.entries.get_mut(key) {
            None => Err(SweepError::key_not_found(key)),
            Some(ConfigValue::Node(node)) => Ok(node),
            Some(ConfigValue::Leaf(_)) => Err(SweepError::contract(format!(
                "key '{key}' holds a leaf, not a nested config"
            ))),
        }
    }

    /// Assign a value. A mapping becomes a nested node (mode inherited);
    /// anything else is stored as a leaf whose usage record is reset to a
    /// single access. Assignment is a fresh definition in every mode,
    /// regardless of prior reads.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match value {
            Value::Mapping(mapping) => {
                self.usage.shift_remove(&key);
                self.entries
                    .insert(key, ConfigValue::Node(ConfigNode::new(mapping, self.mode)));
            }
            other => {
                self.usage.insert(
                    key.clone(),
                    UsageRecord {
                        count: 1,
                        hist: Vec::new(),
                    },
                );
                self.entries.insert(key, ConfigValue::Leaf(other));
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order. No usage side effects.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in insertion order. No usage side effects.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deep-clone the value tree into a detached container with the default
    /// `count` mode and no usage carried over.
    pub fn copy(&self) -> ConfigNode {
        self.copy_with_mode(UsageMode::Count)
    }

    /// Deep-clone with an explicit usage mode.
    pub fn copy_with_mode(&self, mode: UsageMode) -> ConfigNode {
        ConfigNode::new(self.to_mapping(), mode)
    }

    /// Convert back to a plain nested mapping, discarding usage state.
    pub fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        for (key, value) in &self.entries {
            let plain = match value {
                ConfigValue::Leaf(leaf) => leaf.clone(),
                ConfigValue::Node(node) => node.to_value(),
            };
            mapping.insert(Value::String(key.clone()), plain);
        }
        mapping
    }

    pub fn to_value(&self) -> Value {
        Value::Mapping(self.to_mapping())
    }

    /// Mirror the tree's shape with leaf values replaced by the requested
    /// usage field: the read count, or the `file:line:column` labels of the
    /// recorded access sites.
    pub fn usage_snapshot(&self, field: UsageField) -> Value {
        let mut mapping = Mapping::new();
        for (key, value) in &self.entries {
            let snap = match value {
                ConfigValue::Node(node) => node.usage_snapshot(field),
                ConfigValue::Leaf(_) => {
                    let record = self.usage.get(key);
                    match field {
                        UsageField::Count => Value::Number(serde_yaml::Number::from(
                            record.map(|r| r.count).unwrap_or(0),
                        )),
                        UsageField::Hist => Value::Sequence(
                            record
                                .map(|r| {
                                    r.hist
                                        .iter()
                                        .map(|site| Value::String(site.label()))
                                        .collect()
                                })
                                .unwrap_or_default(),
                        ),
                    }
                }
            };
            mapping.insert(Value::String(key.clone()), snap);
        }
        Value::Mapping(mapping)
    }

    /// Join every nested path into a dotted top-level key (`a.b.c`).
    ///
    /// Key names containing the `.` delimiter make the joined names
    /// ambiguous; colliding names silently overwrite in iteration order and
    /// the round trip through [`ConfigNode::unflatten`] is then lossy.
    pub fn flatten(&self) -> ConfigNode {
        let mut flat = Mapping::new();
        self.flatten_into("", &mut flat);
        ConfigNode::new(flat, UsageMode::Count)
    }

    fn flatten_into(&self, prefix: &str, out: &mut Mapping) {
        for (key, value) in &self.entries {
            let name = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            match value {
                ConfigValue::Node(node) => node.flatten_into(&name, out),
                ConfigValue::Leaf(leaf) => {
                    out.insert(Value::String(name), leaf.clone());
                }
            }
        }
    }

    /// Recover the nested shape from dotted keys: each key is split on `.`
    /// into a single-path tree and the trees are deep-merged in key order.
    pub fn unflatten(&self) -> ConfigNode {
        let mut recovered = Mapping::new();
        for (key, value) in &self.entries {
            let leaf = match value {
                ConfigValue::Leaf(leaf) => leaf.clone(),
                ConfigValue::Node(node) => node.to_value(),
            };
            let mut tree = leaf;
            for part in key.rsplit('.') {
                let mut wrapper = Mapping::new();
                wrapper.insert(Value::String(part.to_string()), tree);
                tree = Value::Mapping(wrapper);
            }
            recovered = match deep_merge(Value::Mapping(recovered), tree) {
                Value::Mapping(merged) => merged,
                _ => Mapping::new(),
            };
        }
        ConfigNode::new(recovered, UsageMode::Count)
    }

    /// Serialize as YAML to a storage location, creating parents as needed.
    pub fn save(&self, storage: &dyn Storage, url: &str) -> Result<()> {
        let text =
            serde_yaml::to_string(&self.to_value()).map_err(|e| SweepError::yaml(url, e))?;
        storage.write(url, &text)
    }

    /// Pretty YAML rendering for human display.
    pub fn render(&self) -> String {
        serde_yaml::to_string(&self.to_value()).unwrap_or_default()
    }
}

impl PartialEq for ConfigNode {
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries.iter().all(|(key, value)| {
            other
                .entries
                .get(key)
                .is_some_and(|other_value| value == other_value)
        })
    }
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .unwrap_or_default()
            .trim_end()
            .to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
