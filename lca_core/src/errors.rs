//! # Error Types
//!
//! Structured error types for lca_core. Each variant maps onto one class of
//! pipeline failure so the orchestrator can decide whether to abort the whole
//! run, abort a single template model, or keep going.
//!
//! | Class | Variants | Effect |
//! |---|---|---|
//! | Configuration | `Configuration` | abort the whole run |
//! | Source location | `SourceNotFound`, `AmbiguousSource` | abort that model |
//! | Stage dependency | `MissingUpstream` | abort that model |
//! | I/O and format | `FileError`, `FormatError`, `MissingColumn`, `SerializationError` | abort that model |
//!
//! A join miss against a background dataset is *not* an error: the affected
//! row carries null impacts instead.
//!
//! ## Example
//!
//! ```rust
//! use lca_core::errors::{LcaError, LcaResult};
//!
//! fn validate_weight(weight_kg: f64) -> LcaResult<()> {
//!     if weight_kg < 0.0 {
//!         return Err(LcaError::invalid_input(
//!             "Weight (kg)",
//!             weight_kg.to_string(),
//!             "Weight cannot be negative",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for lca_core operations
pub type LcaResult<T> = Result<T, LcaError>;

/// Structured error type for pipeline operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum LcaError {
    /// Required configuration key absent or invalid
    #[error("Configuration error for '{key}': {reason}")]
    Configuration { key: String, reason: String },

    /// No candidate file where exactly one is expected
    #[error("No {expected} found in '{directory}'")]
    SourceNotFound { directory: String, expected: String },

    /// More than one candidate file where exactly one is expected
    #[error("There should only be one {expected} in '{directory}', found {}: {}", .candidates.len(), .candidates.join(", "))]
    AmbiguousSource {
        directory: String,
        expected: String,
        candidates: Vec<String>,
    },

    /// An upstream stage artifact required by a dependent stage is missing
    #[error("Missing upstream artifact for {stage}: '{path}' (run the {upstream} stage first)")]
    MissingUpstream {
        stage: String,
        upstream: String,
        path: String,
    },

    /// An input value is invalid (out of range, unparsable, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A table lacks a column the stage needs
    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    /// A reference row every BOM row depends on is absent
    #[error("Key '{key}' not found in background dataset {dataset}")]
    BackgroundKeyNotFound { dataset: String, key: String },

    /// Malformed tabular input
    #[error("Format error in '{path}': {reason}")]
    FormatError { path: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// Model directory is locked by another process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON / YAML / binary serialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Stage exists in the life-cycle map but has no computation yet
    #[error("Stage not implemented: {stage}")]
    NotImplemented { stage: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl LcaError {
    /// Create a Configuration error
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        LcaError::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        LcaError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingColumn error
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        LcaError::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a MissingUpstream error
    pub fn missing_upstream(stage: impl Into<String>, upstream: impl Into<String>, path: impl Into<String>) -> Self {
        LcaError::MissingUpstream {
            stage: stage.into(),
            upstream: upstream.into(),
            path: path.into(),
        }
    }

    /// Create a FormatError
    pub fn format_error(path: impl Into<String>, reason: impl Into<String>) -> Self {
        LcaError::FormatError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        LcaError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        LcaError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        LcaError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, LcaError::FileLocked { .. })
    }

    /// True when the error should stop every model, not just the current one
    pub fn aborts_run(&self) -> bool {
        matches!(self, LcaError::Configuration { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            LcaError::Configuration { .. } => "CONFIGURATION",
            LcaError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            LcaError::AmbiguousSource { .. } => "AMBIGUOUS_SOURCE",
            LcaError::MissingUpstream { .. } => "MISSING_UPSTREAM",
            LcaError::InvalidInput { .. } => "INVALID_INPUT",
            LcaError::MissingColumn { .. } => "MISSING_COLUMN",
            LcaError::BackgroundKeyNotFound { .. } => "BACKGROUND_KEY_NOT_FOUND",
            LcaError::FormatError { .. } => "FORMAT_ERROR",
            LcaError::FileError { .. } => "FILE_ERROR",
            LcaError::FileLocked { .. } => "FILE_LOCKED",
            LcaError::SerializationError { .. } => "SERIALIZATION_ERROR",
            LcaError::NotImplemented { .. } => "NOT_IMPLEMENTED",
            LcaError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
