//! Streaming blob and export downloads

use drivesync_core::domain::RemoteId;
use drivesync_core::ports::{ContentSource, IRemoteTransport};
use drivesync_remote::RemoteError;
use tokio::io::AsyncReadExt;
use wiremock::{
    matchers::{method, path},
    Mock, ResponseTemplate,
};

use crate::common;

async fn read_all(transport: &impl IRemoteTransport, source: &ContentSource) -> Vec<u8> {
    let mut stream = transport.download(source).await.expect("download failed");
    let mut data = Vec::new();
    stream.read_to_end(&mut data).await.expect("stream failed");
    data
}

#[tokio::test]
async fn test_download_blob_by_id() {
    let (server, transport) = common::setup_drive_mock().await;
    let content = b"Hello, drive! This is test content.";
    common::mount_content(&server, "file-1", content).await;

    let data = read_all(
        &transport,
        &ContentSource::Blob(RemoteId::new("file-1").unwrap()),
    )
    .await;

    assert_eq!(data, content);
}

#[tokio::test]
async fn test_download_large_blob_streams_to_disk() {
    let (server, transport) = common::setup_drive_mock().await;
    let content: Vec<u8> = (0..1_048_576).map(|i| (i % 251) as u8).collect();
    common::mount_content(&server, "large-1", &content).await;

    let dir = tempfile::TempDir::new().unwrap();
    let target = dir.path().join("large.bin");
    let mut file = tokio::fs::File::create(&target).await.unwrap();
    let mut stream = transport
        .download(&ContentSource::Blob(RemoteId::new("large-1").unwrap()))
        .await
        .unwrap();
    let copied = tokio::io::copy(&mut stream, &mut file).await.unwrap();
    drop(file);

    assert_eq!(copied, 1_048_576);
    assert_eq!(std::fs::read(&target).unwrap(), content);
}

#[tokio::test]
async fn test_download_export_uses_absolute_link() {
    let (server, transport) = common::setup_drive_mock().await;
    common::mount_export(&server, "doc-1", b"PK\x03\x04docx").await;

    let url = format!("{}/export/doc-1/docx", server.uri());
    let data = read_all(&transport, &ContentSource::Export(url)).await;

    assert_eq!(data, b"PK\x03\x04docx");
}

#[tokio::test]
async fn test_download_server_error() {
    let (server, transport) = common::setup_drive_mock().await;
    Mock::given(method("GET"))
        .and(path("/files/file-1/content"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = transport
        .download(&ContentSource::Blob(RemoteId::new("file-1").unwrap()))
        .await;

    let err = match result {
        Ok(_) => panic!("expected a server error"),
        Err(err) => err,
    };
    assert!(matches!(
        err.downcast_ref::<RemoteError>(),
        Some(RemoteError::ServerError(_))
    ));
}

#[tokio::test]
async fn test_download_malformed_export_link() {
    let (_server, transport) = common::setup_drive_mock().await;

    let result = transport
        .download(&ContentSource::Export("::not-a-url".to_string()))
        .await;

    assert!(result.is_err());
}
