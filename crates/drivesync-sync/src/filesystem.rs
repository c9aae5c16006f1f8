//! Local filesystem helpers
//!
//! Thin `tokio::fs` wrappers used by the change handlers. Every helper
//! reports failures as [`ApplyError::Io`] carrying the offending path.
//!
//! ## Design Decisions
//!
//! - **Idempotent directories**: directory creation is recursive and
//!   treats an existing directory as success, so concurrent adds that share
//!   a parent never race each other into a failure.
//! - **Total deletes**: removal handles files and whole subtrees; a path
//!   that is already gone counts as removed.
//! - **mtime via `filetime`**: run on the blocking pool since it is a
//!   plain syscall.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use drivesync_core::domain::FileMeta;
use filetime::FileTime;
use tracing::{debug, instrument, warn};

use crate::ApplyError;

/// Permission bits for directories created by a pull
#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Stats a local path, `None` if it does not exist
pub async fn local_meta(path: &Path) -> Result<Option<FileMeta>, ApplyError> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => Ok(Some(FileMeta::local(path, &metadata))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(ApplyError::io(path, err)),
    }
}

/// Creates a directory and all missing ancestors
#[instrument(level = "debug")]
pub async fn create_directory(path: &Path) -> Result<(), ApplyError> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);
    builder
        .create(path)
        .await
        .map_err(|err| ApplyError::io(path, err))?;
    debug!("directory ready");
    Ok(())
}

/// Makes sure the parent directory chain of `path` exists
pub async fn ensure_parent(path: &Path) -> Result<(), ApplyError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_directory(parent).await,
        _ => Ok(()),
    }
}

/// Sets the modification time of `path`
#[instrument(level = "debug")]
pub async fn set_mod_time(path: &Path, mod_time: DateTime<Utc>) -> Result<(), ApplyError> {
    let target = path.to_path_buf();
    let file_time =
        FileTime::from_unix_time(mod_time.timestamp(), mod_time.timestamp_subsec_nanos());

    tokio::task::spawn_blocking(move || filetime::set_file_mtime(&target, file_time))
        .await
        .map_err(|err| ApplyError::TaskPanicked(err.to_string()))?
        .map_err(|err| ApplyError::io(path, err))
}

/// Removes a file or a whole directory subtree
///
/// Returns `false` if nothing existed at `path`.
#[instrument(level = "debug")]
pub async fn remove_all(path: &Path) -> Result<bool, ApplyError> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("already absent");
            return Ok(false);
        }
        Err(err) => return Err(ApplyError::io(path, err)),
    };

    let result = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };

    match result {
        Ok(()) => Ok(true),
        // Lost a race with another remover
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(ApplyError::io(path, err)),
    }
}

/// A file being written; removed on drop unless [`PartialFile::keep`] ran
///
/// The guard also fires when the writing future is dropped mid-transfer,
/// which is how a timed-out or cancelled download loses its partial file.
#[derive(Debug)]
pub struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Marks the file complete and returns its path
    pub fn keep(mut self) -> PathBuf {
        self.path.take().unwrap_or_default()
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        // Drop cannot await; a single unlink is short enough to block on
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed partial file"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(path = %path.display(), %err, "Failed to remove partial file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_create_directory_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("c");

        create_directory(&nested).await.unwrap();
        create_directory(&nested).await.unwrap();

        assert!(nested.is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("d");
        create_directory(&target).await.unwrap();

        let mode = std::fs::metadata(&target).unwrap().permissions().mode();
        // umask may only clear bits
        assert_eq!(mode & 0o777 & !DIR_MODE, 0);
    }

    #[tokio::test]
    async fn test_ensure_parent_creates_chain() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x").join("y").join("f.txt");

        ensure_parent(&file).await.unwrap();

        assert!(dir.path().join("x").join("y").is_dir());
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn test_set_mod_time_on_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"data").unwrap();
        let when = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();

        set_mod_time(&file, when).await.unwrap();
        set_mod_time(dir.path(), when).await.unwrap();

        let file_meta = local_meta(&file).await.unwrap().unwrap();
        assert_eq!(file_meta.mod_time, when);
        let dir_meta = local_meta(dir.path()).await.unwrap().unwrap();
        assert_eq!(dir_meta.mod_time, when);
    }

    #[tokio::test]
    async fn test_set_mod_time_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let err = set_mod_time(&dir.path().join("missing"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::Io { .. }));
    }

    #[test]
    fn test_partial_file_is_removed_unless_kept() {
        let dir = TempDir::new().unwrap();
        let dropped = dir.path().join("dropped.bin");
        let kept = dir.path().join("kept.bin");
        std::fs::write(&dropped, b"half").unwrap();
        std::fs::write(&kept, b"whole").unwrap();

        drop(PartialFile::new(&dropped));
        let returned = PartialFile::new(&kept).keep();

        assert!(!dropped.exists());
        assert_eq!(returned, kept);
        assert_eq!(std::fs::read(&kept).unwrap(), b"whole");
        // Already gone is not an error
        drop(PartialFile::new(dir.path().join("never-written")));
    }

    #[tokio::test]
    async fn test_remove_all_file_subtree_and_missing() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"data").unwrap();
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("inner")).unwrap();
        std::fs::write(tree.join("inner").join("g.txt"), b"g").unwrap();

        assert!(remove_all(&file).await.unwrap());
        assert!(remove_all(&tree).await.unwrap());
        assert!(!remove_all(&tree).await.unwrap());

        assert!(!file.exists());
        assert!(!tree.exists());
    }

    #[tokio::test]
    async fn test_local_meta_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(local_meta(&dir.path().join("nope")).await.unwrap().is_none());
    }
}
