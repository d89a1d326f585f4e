//! Planner configuration and validation.
//!
//! ```
//! use snakegrid_logic::config::{validate_config, PlannerConfig};
//!
//! let mut config = PlannerConfig::default();
//! config.max_depth = 12;
//! assert!(validate_config(&config).is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest search any level may ask for.
pub const MAX_SEARCH_DEPTH: u32 = 64;

/// Search policy for one level. Fixed for the duration of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Whether upward moves are generated at all.
    pub allow_up: bool,
    /// Longest move sequence considered.
    pub max_depth: u32,
    /// Cap on search nodes built across all deepening rounds (None = unbounded).
    pub max_expansions: Option<usize>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            allow_up: false,
            max_depth: 8,
            max_expansions: Some(200_000),
        }
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Depth of zero can never reach anything.
    ZeroDepth,
    /// Depth above [`MAX_SEARCH_DEPTH`].
    DepthTooLarge(u32),
    /// Expansion budget of zero.
    ZeroExpansions,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroDepth => write!(f, "max_depth must be at least 1"),
            ConfigError::DepthTooLarge(d) => {
                write!(f, "max_depth {} exceeds limit {}", d, MAX_SEARCH_DEPTH)
            }
            ConfigError::ZeroExpansions => write!(f, "max_expansions must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validate a planner configuration, returning all errors found.
pub fn validate_config(config: &PlannerConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if config.max_depth == 0 {
        errors.push(ConfigError::ZeroDepth);
    }
    if config.max_depth > MAX_SEARCH_DEPTH {
        errors.push(ConfigError::DepthTooLarge(config.max_depth));
    }
    if config.max_expansions == Some(0) {
        errors.push(ConfigError::ZeroExpansions);
    }

    errors
}
