//! Remote transport port (driven/secondary port)
//!
//! Authenticated access to the cloud drive: metadata lookups and content
//! streams. The apply engine never sees HTTP; it only asks for a byte
//! stream and copies it to disk.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and are reported per change, not classified.
//! - Content is returned as a stream so large files are never buffered
//!   in memory.

use std::fmt;
use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::domain::change::FileMeta;
use crate::domain::newtypes::RemoteId;

/// Streaming body of a download; dropping it releases the connection
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Where the bytes of a download come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Raw blob addressed by the remote item ID
    Blob(RemoteId),
    /// Export of a cloud-native document through an export link
    Export(String),
}

impl fmt::Display for ContentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Blob(id) => write!(f, "blob:{id}"),
            ContentSource::Export(url) => write!(f, "export:{url}"),
        }
    }
}

/// A named child of a remote directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name within its parent
    pub name: String,
    /// Snapshot of the entry
    pub meta: FileMeta,
}

/// Port trait for the remote side of a pull
///
/// ## Implementation Notes
///
/// - `download` with [`ContentSource::Blob`] uses the item ID; with
///   [`ContentSource::Export`] the URL is used as-is.
/// - Implementations must not retry internally; failures surface as a
///   failed change.
#[async_trait::async_trait]
pub trait IRemoteTransport: Send + Sync {
    /// Looks up the metadata of the entry at a remote path
    ///
    /// # Arguments
    /// * `path` - Remote path relative to the drive root (`""` or `"/"` for the root)
    async fn fetch_by_path(&self, path: &str) -> anyhow::Result<FileMeta>;

    /// Lists the children of a remote directory
    ///
    /// # Arguments
    /// * `id` - The remote identifier of the directory
    async fn list_children(&self, id: &RemoteId) -> anyhow::Result<Vec<RemoteEntry>>;

    /// Opens a content stream
    ///
    /// # Arguments
    /// * `source` - Blob ID or export URL to stream from
    async fn download(&self, source: &ContentSource) -> anyhow::Result<ByteStream>;
}
