use std::io;

use serde::{Deserialize, Serialize};

/// What the master does with a merge whose grid version trails the local
/// one. The historical behavior is `Fatal`; `Drop` treats a lagging
/// worker's chunk as a logged lost update instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleMergePolicy {
    #[default]
    Fatal,
    Drop,
}

/// Per-process protocol configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub stale_merge_policy: StaleMergePolicy,
    /// Samples handed to a worker per batch assignment.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default)]
    pub cross_validation: bool,
}

fn default_batch_size() -> u64 {
    256
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            stale_merge_policy: StaleMergePolicy::default(),
            batch_size: default_batch_size(),
            cross_validation: false,
        }
    }
}

impl NodeConfig {
    pub fn from_json(raw: &str) -> io::Result<Self> {
        serde_json::from_str(raw).map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_an_empty_object() {
        let cfg = NodeConfig::from_json("{}").unwrap();
        assert_eq!(cfg.stale_merge_policy, StaleMergePolicy::Fatal);
        assert_eq!(cfg.batch_size, 256);
        assert!(!cfg.cross_validation);
    }

    #[test]
    fn policy_parses_snake_case() {
        let cfg = NodeConfig::from_json(r#"{"stale_merge_policy":"drop","batch_size":32}"#).unwrap();
        assert_eq!(cfg.stale_merge_policy, StaleMergePolicy::Drop);
        assert_eq!(cfg.batch_size, 32);
    }
}
