//! Progress reporter adapters

use std::sync::atomic::{AtomicUsize, Ordering};

use drivesync_core::ports::IProgressReporter;
use tracing::{debug, info};

/// Lock-free task counter that logs through `tracing`
///
/// Safe to share between workers; `on_task_done` may be called from any
/// thread.
#[derive(Debug, Default)]
pub struct CountingProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl CountingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks announced by the last `on_start`
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    /// Number of tasks finished so far
    pub fn done(&self) -> usize {
        self.done.load(Ordering::Acquire)
    }
}

impl IProgressReporter for CountingProgress {
    fn on_start(&self, total: usize) {
        self.done.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
        debug!(total, "Progress started");
    }

    fn on_task_done(&self) {
        let done = self.done.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(done, total = self.total(), "Task finished");
    }

    fn on_finish(&self) {
        info!(done = self.done(), total = self.total(), "All batches finished");
    }

    fn on_notice(&self, message: &str) {
        info!("{message}");
    }
}
