//! Error types for the check filter crate.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FilterError>;

/// A filter string that could not be parsed.
///
/// Carries the whole input plus the byte offset and the fragment where parsing
/// stopped, so the caller can log something an operator can act on.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("fail to parse filter '{input}' at position {position} near '{fragment}': {reason}")]
pub struct ParseError {
    pub input: String,
    pub position: usize,
    pub fragment: String,
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(input: &str, position: usize, reason: impl Into<String>) -> Self {
        let mut position = position.min(input.len());
        while !input.is_char_boundary(position) {
            position -= 1;
        }
        let fragment: String = input[position..].chars().take(24).collect();
        Self {
            input: input.to_string(),
            position,
            fragment,
            reason: reason.into(),
        }
    }
}

/// Failure while attaching checkers to a parsed tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("unknown filter label {0}")]
    UnknownLabel(String),

    #[error("{label} unable to use value '{value}': {reason}")]
    InvalidValue {
        label: String,
        value: String,
        reason: String,
    },

    #[error("label {label} does not support {usage}")]
    Unsupported { label: String, usage: String },
}

impl BindError {
    pub fn invalid_value(
        label: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BindError::InvalidValue {
            label: label.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(label: impl Into<String>, usage: impl Into<String>) -> Self {
        BindError::Unsupported {
            label: label.into(),
            usage: usage.into(),
        }
    }
}

/// Umbrella error returned by the higher level entry points.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for FilterError {
    fn from(err: serde_yaml::Error) -> Self {
        FilterError::Config(err.to_string())
    }
}
