//! Filter string compiler.
//!
//! Turns an operator-supplied filter string into a [`FilterNode`] tree:
//! - the parser tokenizes the string and reads each nesting level as a flat
//!   `term (op term)*` sequence
//! - a regrouping pass folds each flat sequence into a tree where `&&` binds
//!   tighter than `||`
//!
//! # Examples
//!
//! ```rust
//! use check_filter::{FilterCompiler, FilterConfig, FilterNode};
//!
//! let compiler = FilterCompiler::with_config(FilterConfig::new().with_max_depth(4));
//! let tree = compiler.parse("exe == 'sshd' && (time_percent > 50% || state != 'started')")?;
//!
//! assert!(matches!(tree, FilterNode::Combinator(_)));
//! assert_eq!(tree.leaf_count(), 3);
//! # Ok::<(), check_filter::ParseError>(())
//! ```

mod parser;
mod regroup;

use crate::ast::FilterNode;
use crate::config::FilterConfig;
use crate::error::{ParseError, Result};
use crate::matcher::{BoundFilter, CheckerBuilder};
use tracing::{debug, error};

/// Filter compiler holding the limits applied to every parsed string.
#[derive(Debug, Clone, Default)]
pub struct FilterCompiler {
    config: FilterConfig,
}

impl FilterCompiler {
    /// Create a compiler with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FilterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Parse a filter string.
    ///
    /// Surrounding whitespace is ignored; error positions are byte offsets in
    /// the trimmed string. No partial tree is ever returned.
    pub fn parse(&self, text: &str) -> std::result::Result<FilterNode, ParseError> {
        let filter = text.trim();

        let parsed = if filter.is_empty() {
            Err(ParseError::new(filter, 0, "empty filter"))
        } else if filter.len() > self.config.max_length {
            Err(ParseError::new(
                filter,
                self.config.max_length,
                format!("filter longer than {} bytes", self.config.max_length),
            ))
        } else {
            parser::parse_tokens(filter, self.config.max_depth)
        };

        match parsed {
            Ok(node) => {
                debug!(filter, leaves = node.leaf_count(), "filter parsed");
                Ok(node)
            }
            Err(err) => {
                error!(
                    filter,
                    position = err.position,
                    fragment = %err.fragment,
                    reason = %err.reason,
                    "fail to parse filter"
                );
                Err(err)
            }
        }
    }

    /// Parse `text` and bind the result with `builder`.
    ///
    /// The bound filter inherits this compiler's configuration.
    pub fn compile<R, B>(&self, text: &str, builder: &B) -> Result<BoundFilter<R>>
    where
        B: CheckerBuilder<R>,
    {
        let tree = self.parse(text)?;
        let bound = BoundFilter::bind(&tree, builder)?;
        Ok(bound.with_config(self.config.clone()))
    }
}

/// Parse a filter string with the default configuration.
///
/// ```rust
/// use check_filter::parse;
///
/// assert_eq!(parse("(pid > 1)").unwrap(), parse("pid > 1").unwrap());
/// assert!(parse("toto < 84f && (titi > 53 || uu > 2").is_err());
/// ```
pub fn parse(text: &str) -> std::result::Result<FilterNode, ParseError> {
    FilterCompiler::new().parse(text)
}
