//! Change model
//!
//! A [`Change`] is one row of a pull plan: the transition a single logical
//! path needs so the local tree matches the remote one. Changes are built
//! by a resolver, consumed exactly once by the apply engine and then
//! dropped; they are never mutated after construction.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{RelativePath, RemoteId};

// ============================================================================
// FileMeta
// ============================================================================

/// Snapshot of one filesystem entry, remote or local
///
/// For remote entries `blob_at` is the opaque content locator (empty when the
/// entry can only be exported). For local entries `blob_at` holds the
/// absolute local path of the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Remote item identifier (None for local snapshots)
    pub id: Option<RemoteId>,
    /// Whether this entry is a directory
    pub is_dir: bool,
    /// Content locator, empty if not directly downloadable
    pub blob_at: String,
    /// Export MIME type -> download URL, empty for non-documents
    pub export_links: BTreeMap<String, String>,
    /// MIME type reported for the entry
    pub mime_type: String,
    /// Last modification time
    pub mod_time: DateTime<Utc>,
}

impl FileMeta {
    /// Snapshot of a directory
    pub fn directory(id: Option<RemoteId>, mod_time: DateTime<Utc>) -> Self {
        Self {
            id,
            is_dir: true,
            blob_at: String::new(),
            export_links: BTreeMap::new(),
            mime_type: String::new(),
            mod_time,
        }
    }

    /// Snapshot of a file with a directly downloadable blob
    pub fn blob(
        id: Option<RemoteId>,
        blob_at: impl Into<String>,
        mime_type: impl Into<String>,
        mod_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            is_dir: false,
            blob_at: blob_at.into(),
            export_links: BTreeMap::new(),
            mime_type: mime_type.into(),
            mod_time,
        }
    }

    /// Snapshot of a cloud-native document reachable only through export links
    pub fn document(
        id: Option<RemoteId>,
        mime_type: impl Into<String>,
        export_links: BTreeMap<String, String>,
        mod_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            is_dir: false,
            blob_at: String::new(),
            export_links,
            mime_type: mime_type.into(),
            mod_time,
        }
    }

    /// Snapshot of a local entry; `blob_at` holds the absolute local path
    pub fn local(path: &Path, metadata: &std::fs::Metadata) -> Self {
        let mod_time = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self {
            id: None,
            is_dir: metadata.is_dir(),
            blob_at: path.to_string_lossy().into_owned(),
            export_links: BTreeMap::new(),
            mime_type: String::new(),
            mod_time,
        }
    }

    /// Returns true if the entry carries content that has to be materialized
    pub fn is_content_bearing(&self) -> bool {
        !self.is_dir && (!self.blob_at.is_empty() || !self.export_links.is_empty())
    }

    /// Returns true if the content can only be obtained through an export
    pub fn needs_export(&self) -> bool {
        !self.is_dir && self.blob_at.is_empty()
    }

    /// Describes a violated directory/content invariant, if any
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.is_dir && (!self.blob_at.is_empty() || !self.export_links.is_empty()) {
            return Some("directories cannot carry content");
        }
        None
    }
}

// ============================================================================
// ChangeOp
// ============================================================================

/// Classification of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// Present remotely, absent locally
    Add,
    /// Present on both sides, diverged
    Modify,
    /// Absent remotely, present locally
    Delete,
}

impl ChangeOp {
    /// Returns the short symbol used when printing a change list
    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeOp::Add => "+",
            ChangeOp::Modify => "M",
            ChangeOp::Delete => "-",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeOp::Add => "add",
            ChangeOp::Modify => "modify",
            ChangeOp::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Change
// ============================================================================

/// One path's required local transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    path: RelativePath,
    src: Option<FileMeta>,
    dest: Option<FileMeta>,
}

impl Change {
    /// Builds a change from an optional target and an optional current state
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidChange`] when both sides are absent or
    /// both are present and identical, or when the target snapshot violates
    /// the directory/content invariant.
    pub fn new(
        path: RelativePath,
        src: Option<FileMeta>,
        dest: Option<FileMeta>,
    ) -> Result<Self, DomainError> {
        let reason = match (&src, &dest) {
            (None, None) => Some("source and destination are both absent"),
            (Some(s), Some(d)) if s == d => Some("source and destination are identical"),
            (Some(s), _) => s.invariant_violation(),
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(DomainError::InvalidChange {
                path: path.to_string(),
                reason: reason.to_string(),
            });
        }
        Ok(Self { path, src, dest })
    }

    /// Builds an Add change
    pub fn add(path: RelativePath, src: FileMeta) -> Result<Self, DomainError> {
        Self::new(path, Some(src), None)
    }

    /// Builds a Modify change
    pub fn modify(path: RelativePath, src: FileMeta, dest: FileMeta) -> Result<Self, DomainError> {
        Self::new(path, Some(src), Some(dest))
    }

    /// Builds a Delete change
    pub fn delete(path: RelativePath, dest: FileMeta) -> Result<Self, DomainError> {
        Self::new(path, None, Some(dest))
    }

    /// The logical path of the entry
    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    /// Target state, absent for deletes
    pub fn src(&self) -> Option<&FileMeta> {
        self.src.as_ref()
    }

    /// Current local state, absent for adds
    pub fn dest(&self) -> Option<&FileMeta> {
        self.dest.as_ref()
    }

    /// Derived classification; exactly one variant holds for every change
    pub fn op(&self) -> ChangeOp {
        match (&self.src, &self.dest) {
            (Some(_), None) => ChangeOp::Add,
            (Some(_), Some(_)) => ChangeOp::Modify,
            // Construction rejects (None, None)
            (None, _) => ChangeOp::Delete,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op().symbol(), self.path)
    }
}

// ============================================================================
// ChangeState
// ============================================================================

/// Lifecycle of a change inside the apply engine
///
/// `Pending -> Running -> Done | Failed`. A change that is never dispatched
/// (fail-fast or cancellation) goes `Pending -> Skipped`. Terminal states
/// have no outgoing transitions; there is no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeState {
    #[default]
    Pending,
    Running,
    Done,
    Failed,
    Skipped,
}

impl ChangeState {
    /// Human-readable state name
    pub fn name(&self) -> &'static str {
        match self {
            ChangeState::Pending => "Pending",
            ChangeState::Running => "Running",
            ChangeState::Done => "Done",
            ChangeState::Failed => "Failed",
            ChangeState::Skipped => "Skipped",
        }
    }

    /// Returns true for states with no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChangeState::Done | ChangeState::Failed | ChangeState::Skipped
        )
    }

    /// Returns true if `target` is a legal next state
    pub fn can_transition_to(&self, target: ChangeState) -> bool {
        matches!(
            (self, target),
            (ChangeState::Pending, ChangeState::Running)
                | (ChangeState::Pending, ChangeState::Skipped)
                | (ChangeState::Running, ChangeState::Done)
                | (ChangeState::Running, ChangeState::Failed)
        )
    }

    /// Moves to `target`
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidState`] for an illegal transition
    pub fn transition_to(self, target: ChangeState) -> Result<ChangeState, DomainError> {
        if !self.can_transition_to(target) {
            return Err(DomainError::InvalidState {
                from: self.name().to_string(),
                to: target.name().to_string(),
            });
        }
        Ok(target)
    }
}

impl fmt::Display for ChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
