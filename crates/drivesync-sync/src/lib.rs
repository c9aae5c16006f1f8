//! drivesync Sync - Change-application engine
//!
//! Provides:
//! - Content materialization (raw blob or exported document)
//! - Batched concurrent application of a change list
//! - Pull orchestration (resolve, confirm, apply)
//! - A remote-wins snapshot resolver
//!
//! ## Modules
//!
//! - [`applier`] - Batched concurrent applier and per-operation handlers
//! - [`filesystem`] - Local filesystem helpers (directories, mtimes, removal)
//! - [`materializer`] - Streams remote content into the local tree
//! - [`progress`] - Progress reporter adapters
//! - [`pull`] - Pull orchestrator
//! - [`resolver`] - Snapshot diff resolver

pub mod applier;
pub mod filesystem;
pub mod materializer;
pub mod progress;
pub mod pull;
pub mod resolver;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while applying a single change
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A local filesystem operation failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote transport failed to produce the content stream
    #[error("Transport error: {0:#}")]
    Transport(anyhow::Error),

    /// A change that needs a target state carries none
    #[error("Change has no source snapshot")]
    MissingSource,

    /// A delete change carries no local snapshot
    #[error("Change has no destination snapshot")]
    MissingDestination,

    /// A downloadable blob has no remote identifier to fetch it by
    #[error("Remote entry has no identifier")]
    MissingRemoteId,

    /// The document offers no export link for the selected format
    #[error("No export link for {mime}")]
    MissingExportLink { mime: String },

    /// The change exceeded the per-task timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled while the change was in flight
    #[error("Cancelled")]
    Cancelled,

    /// The worker task panicked or was aborted
    #[error("Task panicked: {0}")]
    TaskPanicked(String),

    /// A domain-level error propagated from drivesync-core
    #[error("Domain error: {0}")]
    Domain(#[from] drivesync_core::domain::DomainError),
}

impl ApplyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ApplyError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort a whole pull
#[derive(Debug, Error)]
pub enum PullError {
    /// Snapshot lookup or diff resolution failed; nothing was applied
    #[error("Resolution failed: {0:#}")]
    Resolution(anyhow::Error),

    /// Two changes in the list target the same path
    #[error("Duplicate path in change list: {0}")]
    DuplicatePath(String),

    /// The confirmation gate failed to produce an answer
    #[error("Confirmation failed: {0:#}")]
    Confirmation(anyhow::Error),
}
