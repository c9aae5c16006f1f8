//! Domain error types
//!
//! Validation failures raised when building paths, identifiers and changes,
//! plus invalid state transitions of a change during apply.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid logical path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// A change whose source/destination pair maps to no operation
    #[error("Invalid change for {path}: {reason}")]
    InvalidChange {
        /// Logical path of the rejected change
        path: String,
        /// Why the pair was rejected
        reason: String,
    },

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },
}
