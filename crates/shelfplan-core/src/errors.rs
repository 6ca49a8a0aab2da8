//! Structured error types shared across shelfplan crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`ShelfError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, conditions, counts).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the operator resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Adds the offending filesystem path to the context.
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context("path", path.display().to_string())
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the scheduling engine.
///
/// Configuration and validation failures are raised before any durable write.
/// Malformed history is reported as [`ShelfError::Validation`] and is never
/// skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum ShelfError {
    /// Capacity/control mismatches and non-divisible replicate targets.
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// Wrong-weekday dates, malformed tables, partially shaped state.
    #[error("validation error: {0}")]
    Validation(ErrorInfo),
    /// Missing, unreadable or corrupt files and lock contention.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl ShelfError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ShelfError::Config(info) | ShelfError::Validation(info) | ShelfError::Io(info) => {
                info
            }
        }
    }

    /// Wraps an I/O failure on `path` under the given code.
    pub fn io(code: &str, path: &Path, err: impl ToString) -> Self {
        ShelfError::Io(ErrorInfo::new(code, err.to_string()).with_path(path))
    }
}
