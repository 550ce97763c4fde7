//! Layered document loader.
//!
//! A composite config path names one to three YAML documents in a single
//! string: `<dir>/<base>[+<overlay>][-<filter>][.yaml]`. Base documents are
//! deep-merged left to right (later wins), then the optional filter document
//! projects the result onto its own key shape. Grammar violations are
//! rejected before any I/O.

use crate::config::merge::{deep_filter, deep_merge};
use crate::config::node::{ConfigNode, UsageMode};
use crate::error::{Result, SweepError};
use crate::storage::{Storage, join};
use regex_lite::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

/// A parsed composite config path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositePath {
    /// Directory prefix the document names resolve against.
    pub dir: String,
    /// One or two base documents, merge order left to right.
    pub bases: Vec<String>,
    /// Optional filter document.
    pub filter: Option<String>,
}

impl CompositePath {
    /// Parse `<dir>/<base>[+<overlay>][-<filter>][.yaml]`.
    ///
    /// At most one `-` and at most one `+` may appear in the stem, and the
    /// `-` must come after the `+` when both are present.
    pub fn parse(path: &str) -> Result<Self> {
        let (dir, stem) = match path.rfind('/') {
            Some(pos) => (&path[..pos], &path[pos + 1..]),
            None => ("", path),
        };
        let stem = stem.strip_suffix(".yaml").unwrap_or(stem);

        let dash_count = stem.matches('-').count();
        if dash_count > 1 {
            return Err(SweepError::malformed_path(
                path,
                "more than one filter separator '-'",
            ));
        }
        if let (Some(dash_pos), Some(plus_pos)) = (stem.rfind('-'), stem.rfind('+'))
            && plus_pos > dash_pos
        {
            return Err(SweepError::malformed_path(
                path,
                "overlay separator '+' appears after the filter separator '-'",
            ));
        }

        let (base_part, filter) = match stem.split_once('-') {
            Some((bases, filter)) => (bases, Some(filter.to_string())),
            None => (stem, None),
        };

        let bases: Vec<String> = base_part.split('+').map(str::to_string).collect();
        if bases.len() > 2 {
            return Err(SweepError::malformed_path(
                path,
                "more than two '+'-joined base documents",
            ));
        }
        if bases.iter().any(String::is_empty) || filter.as_deref() == Some("") {
            return Err(SweepError::malformed_path(path, "empty document name"));
        }

        Ok(CompositePath {
            dir: dir.to_string(),
            bases,
            filter,
        })
    }

    /// Storage url of a named document within this composite path.
    pub fn document_url(&self, name: &str) -> String {
        let file = format!("{name}.yaml");
        if self.dir.is_empty() {
            file
        } else {
            join(&self.dir, &file)
        }
    }
}

/// Load a composite config path with the `hist` usage mode, the default for
/// top-level entry points.
pub fn load(storage: &dyn Storage, path: &str) -> Result<ConfigNode> {
    load_with_mode(storage, path, UsageMode::Hist)
}

/// Load a composite config path: merge the base documents left to right,
/// apply the filter document if present, wrap the result in a [`ConfigNode`].
pub fn load_with_mode(storage: &dyn Storage, path: &str, mode: UsageMode) -> Result<ConfigNode> {
    let composite = CompositePath::parse(path)?;

    let mut merged = Value::Mapping(Mapping::new());
    for base in &composite.bases {
        let document = load_document(storage, &composite.document_url(base))?;
        merged = deep_merge(merged, document);
    }

    if let Some(ref filter) = composite.filter {
        let selector = load_document(storage, &composite.document_url(filter))?;
        merged = deep_filter(&merged, &selector)?;
    }

    ConfigNode::from_value(merged, mode)
}

fn load_document(storage: &dyn Storage, url: &str) -> Result<Value> {
    let text = storage.read_to_string(url)?;
    let value: Value = serde_yaml::from_str(&text).map_err(|e| SweepError::yaml(url, e))?;
    Ok(resolve_float_literals(value))
}

/// Extended YAML 1.1 float grammar the stock parser leaves as strings:
/// underscore-grouped digits, sexagesimal with fraction, and the
/// leading-dot/`.inf`/`.nan` spellings. Search spaces routinely contain
/// these, so unresolved leftovers are converted after parsing.
fn float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^[-+]?(",
            r"[0-9][0-9_]*\.[0-9_]*([eE][-+]?[0-9]+)?",
            r"|[0-9][0-9_]*[eE][-+]?[0-9]+",
            r"|\.[0-9_]+([eE][-+]?[0-9]+)?",
            r"|[0-9][0-9_]*(:[0-5]?[0-9])+\.[0-9_]*",
            r"|\.(inf|Inf|INF)",
            r"|\.(nan|NaN|NAN)",
            r")$",
        ))
        .expect("float literal pattern is valid")
    })
}

/// Recursively convert string scalars matching the extended float grammar
/// into numbers.
pub fn resolve_float_literals(value: Value) -> Value {
    match value {
        Value::String(s) => match parse_extended_float(&s) {
            Some(f) => Value::Number(serde_yaml::Number::from(f)),
            None => Value::String(s),
        },
        Value::Sequence(seq) => {
            Value::Sequence(seq.into_iter().map(resolve_float_literals).collect())
        }
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .into_iter()
                .map(|(k, v)| (k, resolve_float_literals(v)))
                .collect(),
        ),
        other => other,
    }
}

fn parse_extended_float(s: &str) -> Option<f64> {
    if !float_pattern().is_match(s) {
        return None;
    }
    let (sign, body) = match s.strip_prefix('-') {
        Some(body) => (-1.0, body),
        None => (1.0, s.strip_prefix('+').unwrap_or(s)),
    };
    match body.to_ascii_lowercase().as_str() {
        ".inf" => return Some(sign * f64::INFINITY),
        ".nan" => return Some(f64::NAN),
        _ => {}
    }
    let cleaned: String = body.chars().filter(|c| *c != '_').collect();
    if cleaned.contains(':') {
        // Sexagesimal: fold segments base-60, fraction rides on the last.
        let mut total = 0.0;
        for part in cleaned.split(':') {
            total = total * 60.0 + part.parse::<f64>().ok()?;
        }
        return Some(sign * total);
    }
    cleaned.parse::<f64>().ok().map(|f| sign * f)
}
