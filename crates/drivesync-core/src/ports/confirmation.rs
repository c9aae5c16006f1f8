//! Confirmation port
//!
//! Sits between planning and applying a pull. Interactive front-ends print
//! the change list and ask; unattended runs use [`AutoConfirm`].

use crate::domain::change::Change;

/// Port trait for approving a change list before it is applied
#[async_trait::async_trait]
pub trait IConfirmation: Send + Sync {
    /// Returns true if the change list may be applied
    async fn confirm(&self, changes: &[Change]) -> anyhow::Result<bool>;
}

/// Confirmation that approves every change list without asking
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait::async_trait]
impl IConfirmation for AutoConfirm {
    async fn confirm(&self, _changes: &[Change]) -> anyhow::Result<bool> {
        Ok(true)
    }
}
