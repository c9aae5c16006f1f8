//! Shared test helpers for drive API integration tests
//!
//! Each helper mounts mock endpoints on a wiremock server; `setup_drive_mock`
//! returns an `HttpTransport` pointing at it.

use drivesync_remote::client::DriveClient;
use drivesync_remote::transport::HttpTransport;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-access-token";

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Starts a mock server and returns it with an authenticated transport
pub async fn setup_drive_mock() -> (MockServer, HttpTransport) {
    let server = MockServer::start().await;
    let client = DriveClient::new(&server.uri(), Some(TOKEN.to_string())).unwrap();
    (server, HttpTransport::new(client))
}

pub fn folder_json(id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "mimeType": "application/vnd.google-apps.folder",
        "modifiedDate": "2024-05-01T10:00:00Z"
    })
}

pub fn file_json(server: &MockServer, id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "mimeType": "application/octet-stream",
        "downloadUrl": format!("{}/files/{id}/content", server.uri()),
        "modifiedDate": "2024-05-02T11:30:00Z"
    })
}

pub fn document_json(server: &MockServer, id: &str, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "mimeType": "application/vnd.google-apps.document",
        "exportLinks": {
            DOCX_MIME: format!("{}/export/{id}/docx", server.uri()),
            "application/pdf": format!("{}/export/{id}/pdf", server.uri())
        },
        "modifiedDate": "2024-05-03T12:00:00Z"
    })
}

/// Mounts `GET /files?path={drive_path}`
pub async fn mount_item(server: &MockServer, drive_path: &str, item: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("path", drive_path))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(item))
        .mount(server)
        .await;
}

/// Mounts a single-page `GET /files/{id}/children`
pub async fn mount_children(server: &MockServer, id: &str, items: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}/children")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": items
        })))
        .mount(server)
        .await;
}

/// Mounts `GET /files/{id}/content`
pub async fn mount_content(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/files/{id}/content")))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(content.to_vec())
                .insert_header("content-type", "application/octet-stream"),
        )
        .mount(server)
        .await;
}

/// Mounts the docx export link of a document
pub async fn mount_export(server: &MockServer, id: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/export/{id}/docx")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
        .mount(server)
        .await;
}
