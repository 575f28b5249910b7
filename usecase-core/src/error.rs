//! Error types for use case storage and policy lookups

use thiserror::Error;

/// Storage layer errors.
///
/// Every store operation reports its failure mode explicitly so callers can
/// tell a missing record from a taken command from a broken backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Use case not found: {command}")]
    NotFound { command: String },

    #[error("Use case command already exists: {command}")]
    Conflict { command: String },

    #[error("Persistence failed during {operation}: {reason}")]
    Persistence { operation: String, reason: String },

    #[error("Stored row for {command} is corrupt: {reason}")]
    Corrupt { command: String, reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Create a NotFound error.
    pub fn not_found(command: impl Into<String>) -> Self {
        Self::NotFound {
            command: command.into(),
        }
    }

    /// Create a Conflict error.
    pub fn conflict(command: impl Into<String>) -> Self {
        Self::Conflict {
            command: command.into(),
        }
    }

    /// Create a Persistence error for the named operation.
    pub fn persistence(operation: &str, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error means the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Whether the error means the command is already taken.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
