//! Shared error types for servicecut.
//!
//! Degenerate arithmetic (empty groups, `log(0)`, zero call totals) is never
//! reported through this type: sparse and disconnected class graphs are the
//! common case, so every similarity and metric function recovers locally to a
//! neutral value. Errors are reserved for malformed input, invalid
//! configuration and unmet preconditions.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for servicecut operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed parser output or ground-truth data
    #[error("Input error: {message}")]
    Input {
        message: String,
        path: Option<PathBuf>,
    },

    /// Configuration rejected during validation; carries every issue found
    #[error("Configuration error: {}", format_issues(.0))]
    Configuration(Vec<ConfigIssue>),

    /// A ground-truth metric was requested without a ground truth
    #[error("Metric {metric} requires a ground truth grouping")]
    MissingGroundTruth { metric: String },

    /// Requested group count cannot be produced from the given classes
    #[error("Cannot create {requested} groups from {n_items} classes")]
    InvalidClusterCount { requested: usize, n_items: usize },

    /// Parameter outside its accepted domain
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Matrix shapes do not line up
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A linear-algebra routine failed to converge
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Nothing to work on
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create an input error without a path
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            path: None,
        }
    }

    /// Create an input error for a specific file
    pub fn input_with_path(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Input {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

/// A single configuration problem, addressed by its field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Format a list of issues for display.
fn format_issues(issues: &[ConfigIssue]) -> String {
    match issues {
        [] => "no details".to_string(),
        [single] => single.to_string(),
        many => many
            .iter()
            .map(|issue| format!("\n  - {issue}"))
            .collect::<String>(),
    }
}
