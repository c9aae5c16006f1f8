//! Progress reporting port
//!
//! The apply engine announces the total task count before the first batch,
//! one `on_task_done` per completed task (from whichever worker finished
//! it), and `on_finish` after the last batch. Implementations are shared
//! across workers and must synchronize their own state.

/// Port trait for apply progress
pub trait IProgressReporter: Send + Sync {
    /// Called once before the first batch with the number of changes
    fn on_start(&self, total: usize);

    /// Called once per finished change, successful or not
    fn on_task_done(&self);

    /// Called once after the last batch
    fn on_finish(&self);

    /// Human-readable status message (e.g. an exported document rename)
    fn on_notice(&self, _message: &str) {}
}
