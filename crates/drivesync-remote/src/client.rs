//! Drive API client
//!
//! Typed HTTP client for the drive's file endpoints. Handles the optional
//! bearer token, URL construction and status classification; it knows
//! nothing about changes or the local tree.
//!
//! ## Endpoints
//!
//! - `GET {base}/files?path={path}` - metadata of the entry at a path
//! - `GET {base}/files/{id}/children` - children of a folder, paged via
//!   an absolute `nextLink`
//! - `GET {base}/files/{id}/content` - raw content of a blob
//! - `GET {export link}` - exported document content (absolute URL)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use drivesync_remote::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new("https://drive.example.com/v1", Some("token".into()))?;
//! let root = client.get_item_by_path("").await?;
//! println!("{} ({})", root.title, root.id);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::RemoteError;

/// MIME type the drive reports for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// ============================================================================
// Drive API response types
// ============================================================================

/// One file or folder as returned by the drive API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    /// Item ID
    pub id: String,
    /// Display name
    pub title: String,
    /// Reported MIME type
    #[serde(default)]
    pub mime_type: String,
    /// Direct content URL, absent for folders and cloud-native documents
    #[serde(default)]
    pub download_url: Option<String>,
    /// Export MIME type -> URL, present for cloud-native documents
    #[serde(default)]
    pub export_links: BTreeMap<String, String>,
    /// Last modification time
    pub modified_date: DateTime<Utc>,
}

impl DriveItem {
    /// Returns true if the item is a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

/// One page of a folder listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenPage {
    #[serde(default)]
    items: Vec<DriveItem>,
    /// Absolute URL of the next page
    next_link: Option<String>,
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for drive API calls
#[derive(Debug, Clone)]
pub struct DriveClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl DriveClient {
    /// Creates a client for the API rooted at `base_url`
    ///
    /// # Errors
    /// Returns [`RemoteError::InvalidResponse`] if `base_url` is not an
    /// absolute http(s) URL.
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self, RemoteError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| RemoteError::InvalidResponse(format!("Invalid base URL {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidResponse(format!(
                "Unsupported base URL scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    /// Creates a request builder for an absolute URL, adding the bearer token
    pub fn request_url(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Creates a request builder for a path relative to the base URL
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.request_url(method, &format!("{}{}", self.base_url, path))
    }

    /// Looks up the item at a drive path (`""` for the root)
    pub async fn get_item_by_path(&self, path: &str) -> Result<DriveItem, RemoteError> {
        debug!(path, "Fetching item metadata");
        let response = self
            .request(Method::GET, "/files")
            .query(&[("path", path)])
            .send()
            .await?;
        let response = check_status(response, &format!("GET /files?path={path}")).await?;
        parse_json(response).await
    }

    /// Lists every child of a folder, following `nextLink` pages
    pub async fn list_children(&self, id: &str) -> Result<Vec<DriveItem>, RemoteError> {
        let first = format!("{}/files/{id}/children", self.base_url);
        let mut next = Some(first);
        let mut items = Vec::new();
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let response = self.request_url(Method::GET, &url).send().await?;
            let response = check_status(response, &format!("GET {url}")).await?;
            let page: ChildrenPage = parse_json(response).await?;
            pages += 1;
            items.extend(page.items);
            next = page.next_link;
        }

        debug!(id, pages, children = items.len(), "Listed folder");
        Ok(items)
    }

    /// Opens the raw content of a blob
    pub async fn open_content(&self, id: &str) -> Result<Response, RemoteError> {
        debug!(id, "Opening content stream");
        let response = self
            .request(Method::GET, &format!("/files/{id}/content"))
            .send()
            .await?;
        check_status(response, &format!("GET /files/{id}/content")).await
    }

    /// Opens an export link
    pub async fn open_export(&self, url: &str) -> Result<Response, RemoteError> {
        let parsed = Url::parse(url)
            .map_err(|e| RemoteError::InvalidResponse(format!("Invalid export link {url}: {e}")))?;
        debug!(url = %parsed, "Opening export stream");
        let response = self.request_url(Method::GET, parsed.as_str()).send().await?;
        check_status(response, &format!("GET {parsed}")).await
    }
}

/// Maps non-success statuses to [`RemoteError`]
async fn check_status(response: Response, what: &str) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.is_empty() {
        what.to_string()
    } else {
        format!("{what}: {body}")
    };

    Err(match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
        StatusCode::FORBIDDEN => RemoteError::Forbidden(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        s if s.is_server_error() => RemoteError::ServerError(message),
        s => RemoteError::UnexpectedStatus {
            status: s.as_u16(),
            message,
        },
    })
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}
