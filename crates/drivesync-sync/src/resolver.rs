//! Snapshot diff resolver
//!
//! Walks the remote tree through [`IRemoteTransport::list_children`] and
//! the local tree through `tokio::fs`, pairing entries by their local name,
//! and emits the changes that make the local side match the remote side.
//!
//! ## Policy
//!
//! The remote side always wins:
//!
//! - remote only: `Add`, descending into directories
//! - local only: `Delete` of the whole entry (the recursive removal covers
//!   its subtree)
//! - both files with different mtimes (second precision): `Modify`
//! - both directories: descend, no change for the directory itself
//! - file on one side, directory on the other: `Delete`; the remote entry
//!   is added by the next pull
//!
//! Documents that are exported pair with their exported local name
//! (`Report` <-> `Report.docx`). The walk is breadth-first, so every parent
//! precedes its children in the returned list.

use std::collections::{btree_map, BTreeMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use drivesync_core::domain::{export_format_for, Change, DomainError, FileMeta, RelativePath};
use drivesync_core::ports::{IChangeResolver, IRemoteTransport, RemoteEntry};
use tracing::{debug, instrument, warn};

/// Entry pair waiting to be compared
struct Visit {
    /// `None` for the sync root itself
    path: Option<RelativePath>,
    local: Option<FileMeta>,
    remote: Option<FileMeta>,
}

/// Children of one directory, keyed by local name
struct Slot {
    /// Logical (remote) name, without export extension
    name: String,
    local: Option<FileMeta>,
    remote: Option<FileMeta>,
}

/// Remote-wins resolver comparing a remote and a local snapshot tree
pub struct SnapshotResolver {
    root: PathBuf,
    transport: Arc<dyn IRemoteTransport>,
}

impl SnapshotResolver {
    /// Creates a resolver for the local tree rooted at `root`
    pub fn new(root: impl Into<PathBuf>, transport: Arc<dyn IRemoteTransport>) -> Self {
        Self {
            root: root.into(),
            transport,
        }
    }

    fn local_dir(&self, path: Option<&RelativePath>) -> PathBuf {
        match path {
            Some(path) => path.to_local(&self.root),
            None => self.root.clone(),
        }
    }

    async fn visit(
        &self,
        visit: Visit,
        changes: &mut Vec<Change>,
        queue: &mut VecDeque<Visit>,
    ) -> anyhow::Result<()> {
        let Visit {
            path,
            local,
            remote,
        } = visit;

        let Some(path) = path else {
            let Some(remote) = remote else {
                bail!("sync root has no remote snapshot");
            };
            if !remote.is_dir {
                bail!("remote sync root is not a directory");
            }
            if local.as_ref().is_some_and(|l| !l.is_dir) {
                bail!("local sync root {} is not a directory", self.root.display());
            }
            return self.expand(None, &remote, local.is_some(), queue).await;
        };

        match (remote, local) {
            (Some(remote), None) => {
                let is_dir = remote.is_dir;
                changes.push(Change::add(path.clone(), remote.clone())?);
                if is_dir {
                    self.expand(Some(&path), &remote, false, queue).await?;
                }
            }
            (None, Some(local)) => {
                changes.push(Change::delete(path, local)?);
            }
            (Some(remote), Some(local)) if remote.is_dir != local.is_dir => {
                warn!(
                    path = %path,
                    remote_is_dir = remote.is_dir,
                    "Entry changed type, deleting local copy first"
                );
                changes.push(Change::delete(path, local)?);
            }
            (Some(remote), Some(_)) if remote.is_dir => {
                self.expand(Some(&path), &remote, true, queue).await?;
            }
            (Some(remote), Some(local)) => {
                if remote.mod_time.timestamp() != local.mod_time.timestamp() {
                    changes.push(Change::modify(path, remote, local)?);
                }
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// Pairs the children of a directory and queues them
    async fn expand(
        &self,
        path: Option<&RelativePath>,
        remote: &FileMeta,
        local_exists: bool,
        queue: &mut VecDeque<Visit>,
    ) -> anyhow::Result<()> {
        let shown = path.map_or("/", RelativePath::as_str);
        let id = remote
            .id
            .as_ref()
            .with_context(|| format!("Remote directory {shown} has no id"))?;
        let entries = self
            .transport
            .list_children(id)
            .await
            .with_context(|| format!("Failed to list remote directory {shown}"))?;

        let mut slots: BTreeMap<String, Slot> = BTreeMap::new();
        for entry in entries {
            match slots.entry(local_name(&entry)) {
                btree_map::Entry::Occupied(occupied) => {
                    warn!(path = shown, name = %occupied.key(), "Skipping duplicate remote name");
                }
                btree_map::Entry::Vacant(vacant) => {
                    vacant.insert(Slot {
                        name: entry.name,
                        local: None,
                        remote: Some(entry.meta),
                    });
                }
            }
        }

        if local_exists {
            let dir = self.local_dir(path);
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("Failed to read local directory {}", dir.display()))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .with_context(|| format!("Failed to read local directory {}", dir.display()))?
            {
                let Ok(name) = entry.file_name().into_string() else {
                    warn!(path = ?entry.path(), "Skipping non UTF-8 local name");
                    continue;
                };
                let metadata = entry
                    .metadata()
                    .await
                    .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
                let meta = FileMeta::local(&entry.path(), &metadata);
                slots
                    .entry(name.clone())
                    .or_insert_with(|| Slot {
                        name,
                        local: None,
                        remote: None,
                    })
                    .local = Some(meta);
            }
        }

        debug!(path = shown, children = slots.len(), "Expanded directory");
        for slot in slots.into_values() {
            let child = match path {
                Some(parent) => parent.join(&slot.name),
                None if slot.name.contains('/') => Err(DomainError::InvalidPath(format!(
                    "Invalid path component: {}",
                    slot.name
                ))),
                None => RelativePath::new(slot.name.as_str()),
            };
            match child {
                Ok(child) => queue.push_back(Visit {
                    path: Some(child),
                    local: slot.local,
                    remote: slot.remote,
                }),
                Err(err) => warn!(parent = shown, name = %slot.name, %err, "Skipping invalid path"),
            }
        }
        Ok(())
    }
}

/// Name a remote entry has in the local tree
fn local_name(entry: &RemoteEntry) -> String {
    if entry.meta.needs_export() {
        format!(
            "{}.{}",
            entry.name,
            export_format_for(&entry.meta.mime_type).extension
        )
    } else {
        entry.name.clone()
    }
}

/// Parses the pulled path, `None` for the sync root
fn parse_root(path: &str) -> anyhow::Result<Option<RelativePath>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(RelativePath::new(trimmed)?))
}

#[async_trait::async_trait]
impl IChangeResolver for SnapshotResolver {
    #[instrument(skip(self, local, remote))]
    async fn resolve(
        &self,
        path: &str,
        local: Option<&FileMeta>,
        remote: &FileMeta,
    ) -> anyhow::Result<Vec<Change>> {
        let mut changes = Vec::new();
        let mut queue = VecDeque::from([Visit {
            path: parse_root(path)?,
            local: local.cloned(),
            remote: Some(remote.clone()),
        }]);

        while let Some(visit) = queue.pop_front() {
            self.visit(visit, &mut changes, &mut queue).await?;
        }

        debug!(changes = changes.len(), "Resolved change list");
        Ok(changes)
    }
}
