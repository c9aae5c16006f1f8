//! Batched concurrent applier
//!
//! Executes an ordered change list against the local tree. The list is cut
//! into consecutive batches of at most `max_concurrent` changes; every
//! change of a batch runs as its own tokio task, and the next batch starts
//! only after the whole current batch has finished. Batch N therefore
//! observes every effect of batches `0..N`, which is what lets a resolver
//! put a directory in one batch and its children in a later one.
//!
//! Failures are isolated per change and collected into an [`ApplyReport`];
//! one failed change never stops the rest of its batch.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use drivesync_core::config::{PullConfig, DEFAULT_MAX_CONCURRENT};
use drivesync_core::domain::{Change, ChangeOp, ChangeState};
use drivesync_core::ports::{IProgressReporter, IRemoteTransport};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::filesystem;
use crate::materializer::ContentMaterializer;
use crate::{ApplyError, PullError};

// ============================================================================
// ApplyOptions
// ============================================================================

/// Tuning knobs for a [`BatchApplier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Maximum number of changes per batch
    pub max_concurrent: usize,
    /// Per-change timeout, `None` to wait indefinitely
    pub task_timeout: Option<Duration>,
    /// Skip the remaining batches once a batch reports a failure
    pub fail_fast: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            task_timeout: None,
            fail_fast: false,
        }
    }
}

impl From<&PullConfig> for ApplyOptions {
    fn from(config: &PullConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent,
            task_timeout: (config.task_timeout_secs > 0)
                .then(|| Duration::from_secs(config.task_timeout_secs)),
            fail_fast: config.fail_fast,
        }
    }
}

// ============================================================================
// ApplyReport
// ============================================================================

/// Final state of one change
#[derive(Debug)]
pub struct ChangeOutcome {
    pub change: Change,
    pub state: ChangeState,
    /// Set when `state` is [`ChangeState::Failed`]
    pub error: Option<ApplyError>,
}

impl ChangeOutcome {
    fn pending(change: Change) -> Self {
        Self {
            change,
            state: ChangeState::Pending,
            error: None,
        }
    }

    /// Moves along the change lifecycle; an illegal move fails the change
    fn advance(&mut self, target: ChangeState) {
        match self.state.transition_to(target) {
            Ok(next) => self.state = next,
            Err(err) => {
                warn!(path = %self.change.path(), %err, "Illegal change state transition");
                self.state = ChangeState::Failed;
                self.error = Some(ApplyError::Domain(err));
            }
        }
    }

    fn settle(&mut self, result: Result<(), ApplyError>) {
        match result {
            Ok(()) => self.advance(ChangeState::Done),
            Err(err) => {
                self.error = Some(err);
                self.advance(ChangeState::Failed);
            }
        }
    }

    fn skipped(change: Change) -> Self {
        let mut outcome = Self::pending(change);
        outcome.advance(ChangeState::Skipped);
        outcome
    }
}

/// Aggregated result of applying a change list
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// One outcome per change, in change-list order
    pub outcomes: Vec<ChangeOutcome>,
    /// Number of batches that were dispatched
    pub batches: usize,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl ApplyReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.count(ChangeState::Done)
    }

    pub fn failed(&self) -> usize {
        self.count(ChangeState::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(ChangeState::Skipped)
    }

    /// Failed changes with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&Change, &ApplyError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|err| (&o.change, err)))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    fn count(&self, state: ChangeState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }
}

// ============================================================================
// ChangeHandler - per-operation handlers
// ============================================================================

/// Applies a single change to the local tree
pub struct ChangeHandler {
    materializer: ContentMaterializer,
}

impl ChangeHandler {
    pub fn new(materializer: ContentMaterializer) -> Self {
        Self { materializer }
    }

    /// Routes a change to the handler for its operation
    pub async fn apply(&self, change: &Change) -> Result<(), ApplyError> {
        match change.op() {
            ChangeOp::Add => self.local_add(change).await,
            ChangeOp::Modify => self.local_modify(change).await,
            ChangeOp::Delete => self.local_delete(change).await,
        }
    }

    /// Local root changes are applied under
    pub fn root(&self) -> &Path {
        self.materializer.root()
    }

    fn local_path(&self, change: &Change) -> PathBuf {
        change.path().to_local(self.root())
    }

    /// Creates a directory or materializes a file, then stamps its mtime
    async fn local_add(&self, change: &Change) -> Result<(), ApplyError> {
        let src = change.src().ok_or(ApplyError::MissingSource)?;
        let target = self.local_path(change);

        if src.is_dir {
            filesystem::create_directory(&target).await?;
            return filesystem::set_mod_time(&target, src.mod_time).await;
        }

        filesystem::ensure_parent(&target).await?;
        let written = self.materializer.download(change).await?;
        filesystem::set_mod_time(&written, src.mod_time).await
    }

    /// Rewrites content if there is any, then stamps the mtime
    async fn local_modify(&self, change: &Change) -> Result<(), ApplyError> {
        let src = change.src().ok_or(ApplyError::MissingSource)?;

        let written = if src.is_content_bearing() {
            self.materializer.download(change).await?
        } else {
            self.local_path(change)
        };
        filesystem::set_mod_time(&written, src.mod_time).await
    }

    /// Removes the local file or subtree recorded in the destination snapshot
    async fn local_delete(&self, change: &Change) -> Result<(), ApplyError> {
        let dest = change.dest().ok_or(ApplyError::MissingDestination)?;
        let target = if dest.blob_at.is_empty() {
            self.local_path(change)
        } else {
            PathBuf::from(&dest.blob_at)
        };

        if !filesystem::remove_all(&target).await? {
            debug!(path = %target.display(), "Delete target already absent");
        }
        Ok(())
    }
}

// ============================================================================
// BatchApplier
// ============================================================================

/// Applies change lists in sequential batches of concurrent tasks
pub struct BatchApplier {
    handler: Arc<ChangeHandler>,
    progress: Arc<dyn IProgressReporter>,
    options: ApplyOptions,
    cancel: CancellationToken,
}

impl BatchApplier {
    pub fn new(
        root: impl Into<PathBuf>,
        transport: Arc<dyn IRemoteTransport>,
        progress: Arc<dyn IProgressReporter>,
        options: ApplyOptions,
    ) -> Self {
        let materializer = ContentMaterializer::new(root, transport, Arc::clone(&progress));
        Self {
            handler: Arc::new(ChangeHandler::new(materializer)),
            progress,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the current run when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Applies `changes` in order, batch by batch
    ///
    /// # Errors
    /// Returns [`PullError::DuplicatePath`] before anything is touched if two
    /// changes target the same path. Per-change failures are reported in the
    /// returned [`ApplyReport`].
    #[instrument(skip_all, fields(changes = changes.len(), max_concurrent = self.options.max_concurrent))]
    pub async fn apply(&self, changes: Vec<Change>) -> Result<ApplyReport, PullError> {
        check_unique_paths(&changes)?;

        let started = Instant::now();
        let batch_size = self.options.max_concurrent.max(1);
        let total = changes.len();
        let mut report = ApplyReport {
            outcomes: Vec::with_capacity(total),
            ..ApplyReport::default()
        };

        self.progress.on_start(total);
        info!(total, batch_size, "Applying changes");

        let mut halted = false;
        let mut remaining = changes.into_iter().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<Change> = remaining.by_ref().take(batch_size).collect();

            if halted || self.cancel.is_cancelled() {
                halted = true;
                report
                    .outcomes
                    .extend(batch.into_iter().map(ChangeOutcome::skipped));
                continue;
            }

            let outcomes = self.run_batch(report.batches, batch).await;
            let batch_failed = outcomes.iter().any(|o| o.state == ChangeState::Failed);
            report.outcomes.extend(outcomes);
            report.batches += 1;

            if batch_failed && self.options.fail_fast {
                warn!(batch = report.batches - 1, "Batch failed, skipping remaining batches");
                halted = true;
            }
        }

        self.restamp_directories(&report.outcomes).await;

        self.progress.on_finish();
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            batches = report.batches,
            duration_ms = report.duration_ms,
            "Apply completed"
        );
        Ok(report)
    }

    /// Spawns every change of one batch and waits for all of them
    async fn run_batch(&self, index: usize, batch: Vec<Change>) -> Vec<ChangeOutcome> {
        debug!(batch = index, size = batch.len(), "Dispatching batch");

        let handles: Vec<(ChangeOutcome, JoinHandle<Result<(), ApplyError>>)> = batch
            .into_iter()
            .map(|change| {
                let mut outcome = ChangeOutcome::pending(change);
                outcome.advance(ChangeState::Running);
                let handle = self.spawn_change(outcome.change.clone());
                (outcome, handle)
            })
            .collect();

        let joined = join_all(
            handles
                .into_iter()
                .map(|(outcome, handle)| async move { (outcome, handle.await) }),
        )
        .await;

        joined
            .into_iter()
            .map(|(mut outcome, joined)| {
                let result = match joined {
                    Ok(result) => result,
                    Err(join_err) => {
                        // The task never reached its own progress call
                        self.progress.on_task_done();
                        Err(ApplyError::TaskPanicked(join_err.to_string()))
                    }
                };
                let change = &outcome.change;
                match &result {
                    Ok(()) => debug!(path = %change.path(), op = %change.op(), "Change applied"),
                    Err(err) => warn!(path = %change.path(), op = %change.op(), %err, "Change failed"),
                }
                outcome.settle(result);
                outcome
            })
            .collect()
    }

    /// Re-applies directory mtimes once every batch has run
    ///
    /// Writing a child bumps its parent's mtime, so stamps made while the
    /// run was in progress do not survive. Deepest paths go first so that
    /// stamping a directory never disturbs an ancestor stamped later.
    async fn restamp_directories(&self, outcomes: &[ChangeOutcome]) {
        let mut directories: Vec<(&Change, DateTime<Utc>)> = outcomes
            .iter()
            .filter(|o| o.state == ChangeState::Done)
            .filter_map(|o| {
                let src = o.change.src()?;
                src.is_dir.then_some((&o.change, src.mod_time))
            })
            .collect();
        directories.sort_by_key(|(change, _)| {
            Reverse(change.path().as_str().matches('/').count())
        });

        for (change, mod_time) in directories {
            let target = change.path().to_local(self.handler.root());
            if let Err(err) = filesystem::set_mod_time(&target, mod_time).await {
                warn!(path = %change.path(), %err, "Failed to restamp directory");
            }
        }
    }

    fn spawn_change(&self, change: Change) -> JoinHandle<Result<(), ApplyError>> {
        let handler = Arc::clone(&self.handler);
        let progress = Arc::clone(&self.progress);
        let cancel = self.cancel.clone();
        let timeout = self.options.task_timeout;

        tokio::spawn(async move {
            let work = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, handler.apply(&change))
                        .await
                        .unwrap_or(Err(ApplyError::Timeout(limit))),
                    None => handler.apply(&change).await,
                }
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ApplyError::Cancelled),
                result = work => result,
            };
            progress.on_task_done();
            result
        })
    }
}

/// Rejects change lists in which two changes share a path
fn check_unique_paths(changes: &[Change]) -> Result<(), PullError> {
    let mut seen = HashSet::with_capacity(changes.len());
    for change in changes {
        if !seen.insert(change.path().as_str()) {
            return Err(PullError::DuplicatePath(change.path().to_string()));
        }
    }
    Ok(())
}
