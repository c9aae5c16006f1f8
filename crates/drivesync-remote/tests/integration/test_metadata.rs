//! Metadata lookups and folder listings

use drivesync_core::domain::RemoteId;
use drivesync_core::ports::IRemoteTransport;
use drivesync_remote::client::DriveClient;
use drivesync_remote::transport::HttpTransport;
use drivesync_remote::RemoteError;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use crate::common;

#[tokio::test]
async fn test_fetch_by_path_returns_folder() {
    let (server, transport) = common::setup_drive_mock().await;
    common::mount_item(&server, "docs", common::folder_json("docs-1", "docs")).await;

    let meta = transport.fetch_by_path("docs").await.unwrap();

    assert!(meta.is_dir);
    assert_eq!(meta.id.unwrap().as_str(), "docs-1");
    assert_eq!(meta.mod_time.to_rfc3339(), "2024-05-01T10:00:00+00:00");
}

#[tokio::test]
async fn test_fetch_by_path_document_has_export_links() {
    let (server, transport) = common::setup_drive_mock().await;
    let doc = common::document_json(&server, "doc-1", "Report");
    common::mount_item(&server, "Report", doc).await;

    let meta = transport.fetch_by_path("Report").await.unwrap();

    assert!(meta.needs_export());
    assert!(meta.export_links.contains_key(common::DOCX_MIME));
    assert_eq!(meta.mime_type, "application/vnd.google-apps.document");
}

#[tokio::test]
async fn test_fetch_by_path_not_found() {
    let (server, transport) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("path", "missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such file"))
        .mount(&server)
        .await;

    let err = transport.fetch_by_path("missing").await.unwrap_err();

    match err.downcast_ref::<RemoteError>() {
        Some(RemoteError::NotFound(message)) => assert!(message.contains("no such file")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let transport = HttpTransport::new(DriveClient::new(&server.uri(), None).unwrap());

    let err = transport.fetch_by_path("docs").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_malformed_metadata_is_invalid_response() {
    let (server, transport) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = transport.fetch_by_path("docs").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::InvalidResponse(_))
    ));
}

#[tokio::test]
async fn test_list_children_maps_entries() {
    let (server, transport) = common::setup_drive_mock().await;
    let items = vec![
        common::folder_json("sub-1", "sub"),
        common::file_json(&server, "file-1", "a.bin"),
        common::document_json(&server, "doc-1", "Report"),
    ];
    common::mount_children(&server, "root", items).await;

    let entries = transport
        .list_children(&RemoteId::new("root").unwrap())
        .await
        .unwrap();

    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["sub", "a.bin", "Report"]);
    assert!(entries[0].meta.is_dir);
    assert!(!entries[1].meta.blob_at.is_empty());
    assert!(entries[2].meta.needs_export());
}

#[tokio::test]
async fn test_list_children_follows_next_link() {
    let (server, transport) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files/root/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [common::file_json(&server, "file-1", "a.bin")],
            "nextLink": format!("{}/pages/root/2", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pages/root/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [common::file_json(&server, "file-2", "b.bin")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entries = transport
        .list_children(&RemoteId::new("root").unwrap())
        .await
        .unwrap();

    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.bin", "b.bin"]);
}

#[tokio::test]
async fn test_invalid_base_url_is_rejected() {
    assert!(DriveClient::new("not a url", None).is_err());
    assert!(DriveClient::new("ftp://drive.example.com", None).is_err());
}
