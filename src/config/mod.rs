//! Hierarchical config containers and layered YAML loading.

pub mod loader;
pub mod merge;
pub mod node;

pub use loader::{CompositePath, load, load_with_mode};
pub use merge::{deep_filter, deep_merge, deep_merge_all};
pub use node::{AccessSite, ConfigNode, ConfigValue, UsageField, UsageMode, UsageRecord};
