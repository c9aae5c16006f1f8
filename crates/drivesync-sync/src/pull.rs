//! Pull orchestrator
//!
//! One pull is: look up the remote snapshot of a path, stat the local
//! counterpart, ask the resolver for the change list, gate it on
//! confirmation and hand it to the [`BatchApplier`]. Any failure before
//! the applier starts aborts the pull without touching the local tree.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use drivesync_core::domain::{Change, FileMeta, RelativePath};
use drivesync_core::ports::{IChangeResolver, IConfirmation, IRemoteTransport};
use tracing::{info, instrument};

use crate::applier::{ApplyReport, BatchApplier};
use crate::PullError;

/// How a pull ended
#[derive(Debug)]
pub enum PullOutcome {
    /// The resolver found nothing to do
    UpToDate,
    /// The change list was not approved; nothing was applied
    Declined { pending: Vec<Change> },
    /// The change list was applied
    Applied(ApplyReport),
}

/// Drives resolve, confirm and apply for one remote path
pub struct PullOrchestrator {
    root: PathBuf,
    transport: Arc<dyn IRemoteTransport>,
    resolver: Arc<dyn IChangeResolver>,
    confirmation: Arc<dyn IConfirmation>,
    applier: BatchApplier,
}

impl PullOrchestrator {
    pub fn new(
        root: impl Into<PathBuf>,
        transport: Arc<dyn IRemoteTransport>,
        resolver: Arc<dyn IChangeResolver>,
        confirmation: Arc<dyn IConfirmation>,
        applier: BatchApplier,
    ) -> Self {
        Self {
            root: root.into(),
            transport,
            resolver,
            confirmation,
            applier,
        }
    }

    /// Pulls `path` (relative to the drive root, `""` for everything)
    #[instrument(skip(self))]
    pub async fn pull(&self, path: &str) -> Result<PullOutcome, PullError> {
        let remote = self
            .transport
            .fetch_by_path(path)
            .await
            .with_context(|| format!("Failed to fetch remote metadata for {path:?}"))
            .map_err(PullError::Resolution)?;

        let local = self.local_snapshot(path).await.map_err(PullError::Resolution)?;

        let changes = self
            .resolver
            .resolve(path, local.as_ref(), &remote)
            .await
            .map_err(PullError::Resolution)?;

        if changes.is_empty() {
            info!("Everything is up to date");
            return Ok(PullOutcome::UpToDate);
        }

        let approved = self
            .confirmation
            .confirm(&changes)
            .await
            .map_err(PullError::Confirmation)?;
        if !approved {
            info!(pending = changes.len(), "Pull declined");
            return Ok(PullOutcome::Declined { pending: changes });
        }

        let report = self.applier.apply(changes).await?;
        Ok(PullOutcome::Applied(report))
    }

    /// Stats the local counterpart of `path`; absence is not an error
    async fn local_snapshot(&self, path: &str) -> anyhow::Result<Option<FileMeta>> {
        let trimmed = path.trim_matches('/');
        let local_path = if trimmed.is_empty() {
            self.root.clone()
        } else {
            RelativePath::new(trimmed)?.to_local(&self.root)
        };

        match tokio::fs::symlink_metadata(&local_path).await {
            Ok(metadata) => Ok(Some(FileMeta::local(&local_path, &metadata))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to stat {}", local_path.display())),
        }
    }
}
