// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query engine configuration.

use serde::{Deserialize, Serialize};

/// Largest result a query may return after transformation.
pub const MAX_RESULTS: usize = 5000;

/// Configuration for the query engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Row cap applied after filtering and transformation. A result with
    /// more rows than this fails with `ResultTooLarge`.
    pub max_results: usize,
}

impl QueryConfig {
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cap() {
        assert_eq!(QueryConfig::default().max_results, 5000);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: QueryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, QueryConfig::default());
        let config: QueryConfig = serde_json::from_str(r#"{"max_results": 10}"#).unwrap();
        assert_eq!(config.max_results, 10);
    }
}
