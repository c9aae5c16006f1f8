//! HttpTransport - IRemoteTransport implementation over the drive API
//!
//! Converts [`DriveItem`]s into [`FileMeta`] snapshots and exposes content
//! downloads as streaming readers, so files are never held in memory.

use std::io;

use anyhow::Context;
use drivesync_core::config::RemoteConfig;
use drivesync_core::domain::{FileMeta, RemoteId};
use drivesync_core::ports::{ByteStream, ContentSource, IRemoteTransport, RemoteEntry};
use futures_util::TryStreamExt;
use reqwest::Response;
use tokio_util::io::StreamReader;
use tracing::instrument;

use crate::client::{DriveClient, DriveItem};
use crate::RemoteError;

/// Remote transport backed by [`DriveClient`]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: DriveClient,
}

impl HttpTransport {
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// Builds a transport from the `remote` configuration section
    pub fn from_config(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let client = DriveClient::new(&config.base_url, config.access_token.clone())?;
        Ok(Self::new(client))
    }
}

/// Converts an API item into a domain snapshot
pub fn to_file_meta(item: &DriveItem) -> Result<FileMeta, RemoteError> {
    let id = RemoteId::new(item.id.as_str())
        .map_err(|e| RemoteError::InvalidResponse(format!("Bad item id {:?}: {e}", item.id)))?;

    if item.is_folder() {
        return Ok(FileMeta::directory(Some(id), item.modified_date));
    }

    match &item.download_url {
        Some(url) if !url.is_empty() => Ok(FileMeta::blob(
            Some(id),
            url.as_str(),
            item.mime_type.as_str(),
            item.modified_date,
        )),
        _ => Ok(FileMeta::document(
            Some(id),
            item.mime_type.as_str(),
            item.export_links.clone(),
            item.modified_date,
        )),
    }
}

fn into_byte_stream(response: Response) -> ByteStream {
    let body = response.bytes_stream().map_err(io::Error::other);
    Box::pin(StreamReader::new(body))
}

#[async_trait::async_trait]
impl IRemoteTransport for HttpTransport {
    #[instrument(skip(self))]
    async fn fetch_by_path(&self, path: &str) -> anyhow::Result<FileMeta> {
        let item = self.client.get_item_by_path(path).await?;
        Ok(to_file_meta(&item)?)
    }

    #[instrument(skip(self))]
    async fn list_children(&self, id: &RemoteId) -> anyhow::Result<Vec<RemoteEntry>> {
        let items = self.client.list_children(id.as_str()).await?;
        items
            .iter()
            .map(|item| -> anyhow::Result<RemoteEntry> {
                let meta = to_file_meta(item)
                    .with_context(|| format!("Invalid child {:?} of {id}", item.title))?;
                Ok(RemoteEntry {
                    name: item.title.clone(),
                    meta,
                })
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn download(&self, source: &ContentSource) -> anyhow::Result<ByteStream> {
        let response = match source {
            ContentSource::Blob(id) => self.client.open_content(id.as_str()).await?,
            ContentSource::Export(url) => self.client.open_export(url).await?,
        };
        Ok(into_byte_stream(response))
    }
}
