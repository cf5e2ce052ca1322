//! Error types for synthscene.
//!
//! All errors are strongly typed using thiserror and grouped by the layer
//! that raised them. Nothing is recovered locally: any error aborts the
//! running module and with it the whole pipeline, so every message names
//! the offending key, line, or pattern.

use std::path::PathBuf;

use thiserror::Error;

use crate::scene::SceneError;

/// Errors raised while reading or resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No such configuration '{key}'")]
    MissingKey {
        key: String,
    },

    #[error("Cannot convert '{key}' to {expected}: found {found}")]
    TypeConversion {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Unknown provider '{name}'")]
    UnknownProvider {
        name: String,
    },

    #[error("Unknown module '{name}'")]
    UnknownModule {
        name: String,
    },

    #[error("Placeholder <args:{index}> has no matching argument ({available} given)")]
    MissingArgument {
        index: usize,
        available: usize,
    },

    #[error("Failed to parse {origin}: {message}")]
    Parse {
        origin: String,
        message: String,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Creates a type conversion error for `key`.
    #[must_use]
    pub fn conversion(
        key: impl Into<String>,
        expected: impl Into<String>,
        found: impl ToString,
    ) -> Self {
        Self::TypeConversion {
            key: key.into(),
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}

/// Errors raised by entity selection and predicate evaluation.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Types are not matching for '{key}': entity holds {expected}, condition gives {found}")]
    TypeMismatch {
        key: String,
        expected: String,
        found: String,
    },

    #[error("Invalid predicate: {reason}")]
    InvalidPredicate {
        reason: String,
    },

    #[error("Nothing matched: {what}")]
    NoMatch {
        what: String,
    },

    #[error("Index {index} is out of range for {len} selected entities")]
    IndexOutOfRange {
        index: i64,
        len: usize,
    },
}

/// Errors raised while a module executes.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Unknown custom function name: {name}")]
    UnknownFunction {
        name: String,
    },

    #[error("{path}:{line}: {reason}")]
    LineFormat {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Top-level error type for synthscene.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

impl From<SceneError> for SynthError {
    fn from(err: SceneError) -> Self {
        Self::Execution(ExecutionError::Scene(err))
    }
}

impl SynthError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a selection error.
    #[must_use]
    pub const fn is_selection(&self) -> bool {
        matches!(self, Self::Selection(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if a required key was absent.
    #[must_use]
    pub const fn is_missing_key(&self) -> bool {
        matches!(self, Self::Config(ConfigError::MissingKey { .. }))
    }

    /// Returns true if a value had the wrong shape or type.
    #[must_use]
    pub const fn is_type_conversion(&self) -> bool {
        matches!(self, Self::Config(ConfigError::TypeConversion { .. }))
    }

    /// Returns true if a predicate target did not fit the attribute type.
    #[must_use]
    pub const fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::Selection(SelectionError::TypeMismatch { .. }))
    }

    /// Returns true if a predicate was malformed.
    #[must_use]
    pub const fn is_invalid_predicate(&self) -> bool {
        matches!(self, Self::Selection(SelectionError::InvalidPredicate { .. }))
    }

    /// Returns true if a selector or pattern produced nothing.
    #[must_use]
    pub const fn is_no_match(&self) -> bool {
        matches!(self, Self::Selection(SelectionError::NoMatch { .. }))
    }

    /// Returns true if an index option was out of range.
    #[must_use]
    pub const fn is_index_out_of_range(&self) -> bool {
        matches!(self, Self::Selection(SelectionError::IndexOutOfRange { .. }))
    }

    /// Returns true if a `cf_` function or modifier name was unknown.
    #[must_use]
    pub const fn is_unknown_function(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::UnknownFunction { .. }))
    }

    /// Returns true if an item file line was malformed.
    #[must_use]
    pub const fn is_line_format(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::LineFormat { .. }))
    }
}

/// Result type alias for synthscene operations.
pub type SynthResult<T> = Result<T, SynthError>;
