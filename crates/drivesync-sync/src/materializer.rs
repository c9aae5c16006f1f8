//! Content materializer
//!
//! Turns the target snapshot of a change into bytes on disk. Entries with a
//! raw blob are streamed verbatim to the change path. Cloud-native
//! documents have no blob; they are exported through the link matching the
//! export table entry for their MIME type and written next to the logical
//! path with the format's extension appended (`Report` -> `Report.docx`).
//!
//! Nothing here is retried. The destination is created before the stream
//! is requested, and a transfer that fails or is dropped part way (timeout,
//! cancellation) removes whatever was written.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use drivesync_core::domain::{export_format_for, Change, ExportFormat, RelativePath};
use drivesync_core::ports::{ContentSource, IProgressReporter, IRemoteTransport};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::filesystem::PartialFile;
use crate::ApplyError;

/// Where a change's content comes from and where it lands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializePlan {
    /// Stream to request from the transport
    pub source: ContentSource,
    /// Logical path written, export extension included
    pub target: RelativePath,
    /// Export format, `None` for raw blobs
    pub export: Option<ExportFormat>,
}

impl MaterializePlan {
    /// Decides source and destination for a change without touching I/O
    ///
    /// # Errors
    /// Fails if the change has no source snapshot, a blob has no remote ID,
    /// or a document lacks the export link its format requires.
    pub fn for_change(change: &Change) -> Result<Self, ApplyError> {
        let src = change.src().ok_or(ApplyError::MissingSource)?;

        if !src.blob_at.is_empty() {
            let id = src.id.clone().ok_or(ApplyError::MissingRemoteId)?;
            return Ok(Self {
                source: ContentSource::Blob(id),
                target: change.path().clone(),
                export: None,
            });
        }

        let format = export_format_for(&src.mime_type);
        let url = src
            .export_links
            .get(format.mime_type)
            .ok_or_else(|| ApplyError::MissingExportLink {
                mime: format.mime_type.to_string(),
            })?;

        Ok(Self {
            source: ContentSource::Export(url.clone()),
            target: change.path().with_appended_extension(format.extension)?,
            export: Some(format),
        })
    }
}

/// Streams remote content into the local tree
pub struct ContentMaterializer {
    root: PathBuf,
    transport: Arc<dyn IRemoteTransport>,
    progress: Arc<dyn IProgressReporter>,
}

impl ContentMaterializer {
    pub fn new(
        root: impl Into<PathBuf>,
        transport: Arc<dyn IRemoteTransport>,
        progress: Arc<dyn IProgressReporter>,
    ) -> Self {
        Self {
            root: root.into(),
            transport,
            progress,
        }
    }

    /// Local root the logical paths are resolved against
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Downloads the content of `change` and returns the absolute path written
    #[instrument(skip(self, change), fields(path = %change.path()))]
    pub async fn download(&self, change: &Change) -> Result<PathBuf, ApplyError> {
        let plan = MaterializePlan::for_change(change)?;
        let destination = plan.target.to_local(&self.root);

        if let Some(format) = plan.export {
            let notice = format!(
                "Exporting {} as {} to {}",
                change.path(),
                format.mime_type,
                destination.display()
            );
            info!(
                path = %change.path(),
                export_mime = format.mime_type,
                destination = %destination.display(),
                "Exporting cloud-native document"
            );
            self.progress.on_notice(&notice);
        }

        let file = tokio::fs::File::create(&destination)
            .await
            .map_err(|err| ApplyError::io(&destination, err))?;
        // Declared after the guard so the handle closes before it unlinks
        let (partial, mut file) = (PartialFile::new(&destination), file);

        let mut stream = self
            .transport
            .download(&plan.source)
            .await
            .map_err(ApplyError::Transport)?;
        let bytes = tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(|err| ApplyError::io(&destination, err))?;
        file.flush()
            .await
            .map_err(|err| ApplyError::io(&destination, err))?;
        drop(file);

        debug!(bytes, source = %plan.source, "Content written");
        Ok(partial.keep())
    }
}
