//! Full pull over HTTP: resolver, applier and materializer against the mock API

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use drivesync_core::ports::AutoConfirm;
use drivesync_sync::applier::{ApplyOptions, BatchApplier};
use drivesync_sync::progress::CountingProgress;
use drivesync_sync::pull::{PullOrchestrator, PullOutcome};
use drivesync_sync::resolver::SnapshotResolver;

use crate::common;

#[tokio::test]
async fn test_pull_materializes_blobs_and_exports() {
    let (server, transport) = common::setup_drive_mock().await;
    common::mount_item(&server, "", common::folder_json("root", "My Drive")).await;
    common::mount_children(
        &server,
        "root",
        vec![
            common::folder_json("docs-1", "docs"),
            common::document_json(&server, "doc-1", "Report"),
        ],
    )
    .await;
    common::mount_children(
        &server,
        "docs-1",
        vec![common::file_json(&server, "file-1", "a.bin")],
    )
    .await;
    common::mount_content(&server, "file-1", b"alpha").await;
    common::mount_export(&server, "doc-1", b"PK docx").await;

    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("Drive");
    let transport = Arc::new(transport);
    let progress = Arc::new(CountingProgress::new());
    let applier = BatchApplier::new(
        &root,
        transport.clone(),
        progress.clone(),
        ApplyOptions::default(),
    );
    let orchestrator = PullOrchestrator::new(
        &root,
        transport.clone(),
        Arc::new(SnapshotResolver::new(&root, transport.clone())),
        Arc::new(AutoConfirm),
        applier,
    );

    let report = match orchestrator.pull("").await.unwrap() {
        PullOutcome::Applied(report) => report,
        other => panic!("expected an applied pull, got {other:?}"),
    };

    assert_eq!(report.failed(), 0, "failures: {:?}", report.failures().collect::<Vec<_>>());
    assert_eq!(report.succeeded(), 3);
    assert_eq!(progress.done(), 3);
    assert_eq!(std::fs::read(root.join("docs/a.bin")).unwrap(), b"alpha");
    assert_eq!(std::fs::read(root.join("Report.docx")).unwrap(), b"PK docx");
    assert!(!root.join("Report").exists());

    let modified = std::fs::metadata(root.join("Report.docx"))
        .unwrap()
        .modified()
        .unwrap();
    let expected = Utc.with_ymd_and_hms(2024, 5, 3, 12, 0, 0).unwrap();
    assert_eq!(chrono::DateTime::<Utc>::from(modified), expected);

    let second = orchestrator.pull("").await.unwrap();
    assert!(matches!(second, PullOutcome::UpToDate));
}
