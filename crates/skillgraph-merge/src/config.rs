//! Tunable parameters of the merge pipeline.

use serde::{Deserialize, Serialize};

/// Configuration for a [`MergeEngine`](crate::MergeEngine).
///
/// The similarity constants are heuristics, not validated thresholds; they
/// are exposed here so callers can tune them per dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Minimum token overlap ratio for two differently named skills to be
    /// treated as duplicates. Default: 0.6.
    pub overlap_threshold: f64,
    /// Require equal tiers for a token-overlap match. Default: true.
    pub require_same_tier: bool,
    /// Shortest word (in characters) that counts as a token. Default: 3.
    pub min_token_len: usize,
    /// Hard cap on cycle-breaking iterations. `None` uses the edge count
    /// plus one, which a correct run never reaches.
    pub max_cycle_iterations: Option<usize>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            overlap_threshold: 0.6,
            require_same_tier: true,
            min_token_len: 3,
            max_cycle_iterations: None,
        }
    }
}

impl MergeConfig {
    /// Resolves the cycle-breaking cap for a graph with `edge_count` edges.
    pub fn cycle_iteration_cap(&self, edge_count: usize) -> usize {
        self.max_cycle_iterations.unwrap_or(edge_count + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = MergeConfig::default();
        assert_eq!(config.overlap_threshold, 0.6);
        assert!(config.require_same_tier);
        assert_eq!(config.min_token_len, 3);
        assert_eq!(config.cycle_iteration_cap(10), 11);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: MergeConfig =
            serde_json::from_str(r#"{"overlap_threshold": 0.75, "max_cycle_iterations": 4}"#)
                .unwrap();
        assert_eq!(config.overlap_threshold, 0.75);
        assert!(config.require_same_tier);
        assert_eq!(config.cycle_iteration_cap(100), 4);
    }
}
