//! Configuration for filter compilation and evaluation.
//!
//! Filter strings come from check configuration written by operators, so the
//! compiler guards against pathological input (very long strings, runaway
//! nesting) and exposes a couple of evaluation knobs.
//!
//! # Examples
//!
//! ```rust
//! use check_filter::FilterConfig;
//!
//! let config = FilterConfig::new()
//!     .with_max_depth(8)
//!     .with_log_evaluations(true);
//! assert_eq!(config.max_depth, 8);
//! ```

use crate::error::{FilterError, Result};
use serde::Deserialize;
use std::path::Path;

/// Filter engine configuration.
///
/// Every field has a default, so a partial YAML document is enough:
///
/// ```rust
/// use check_filter::FilterConfig;
///
/// let config = FilterConfig::from_yaml_str("max_depth: 4").unwrap();
/// assert_eq!(config.max_depth, 4);
/// assert_eq!(config.max_length, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Maximum accepted length of a filter string, in bytes.
    ///
    /// **Default**: 4096
    pub max_length: usize,

    /// Maximum parenthesis nesting depth.
    ///
    /// **Default**: 32
    pub max_depth: usize,

    /// Emit a `trace` event with the boolean result of every top-level check.
    ///
    /// This is per record, so leave it off outside of debugging sessions.
    ///
    /// **Default**: false
    pub log_evaluations: bool,

    /// Minimum number of records before [`BoundFilter::matching_par`] hands the
    /// batch to rayon instead of filtering sequentially.
    ///
    /// [`BoundFilter::matching_par`]: crate::BoundFilter::matching_par
    ///
    /// **Default**: 256
    pub parallel_threshold: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_length: 4096,
            max_depth: 32,
            log_evaluations: false,
            parallel_threshold: 256,
        }
    }
}

impl FilterConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for troubleshooting a check: every evaluation is logged.
    pub fn development() -> Self {
        Self {
            log_evaluations: true,
            ..Default::default()
        }
    }

    /// Configuration for agents filtering large record sets each cycle.
    pub fn high_throughput() -> Self {
        Self {
            log_evaluations: false,
            parallel_threshold: 64,
            ..Default::default()
        }
    }

    /// Load a configuration from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: FilterConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Reject settings that would make every filter fail.
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(FilterError::Config(
                "max_length must be greater than 0".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(FilterError::Config(
                "max_depth must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_log_evaluations(mut self, enable: bool) -> Self {
        self.log_evaluations = enable;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}
