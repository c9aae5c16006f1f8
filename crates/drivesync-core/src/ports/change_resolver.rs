//! Change resolver port
//!
//! The resolver decides *what* a pull has to do: given the remote snapshot
//! of a path and the local snapshot (if the path exists locally) it returns
//! the ordered change list. Which side wins a conflict is its decision
//! alone; the apply engine executes whatever it returns.
//!
//! ## Contract
//!
//! - No two changes in a list target the same logical path.
//! - Parents are listed before their children.

use crate::domain::change::{Change, FileMeta};

/// Port trait for diff resolution
#[async_trait::async_trait]
pub trait IChangeResolver: Send + Sync {
    /// Computes the ordered change list for `path`
    ///
    /// # Arguments
    /// * `path` - Remote path being pulled
    /// * `local` - Local snapshot of the path, `None` if it does not exist
    /// * `remote` - Remote snapshot of the path
    async fn resolve(
        &self,
        path: &str,
        local: Option<&FileMeta>,
        remote: &FileMeta,
    ) -> anyhow::Result<Vec<Change>>;
}
