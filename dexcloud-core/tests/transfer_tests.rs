mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use common::{FakeServer, FakeState, ReceivedPart};
use dexcloud_core::config::UploadMethod;
use dexcloud_core::protocol::Envelope;
use dexcloud_core::{FileLink, FileTransferPanel, TransferError, UploadBatch};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn batch(files: &[(&str, &[u8])]) -> UploadBatch {
    let mut batch = UploadBatch::new();
    for (name, bytes) in files {
        batch.push(*name, bytes.to_vec());
    }
    batch
}

fn hrefs(panel_view: &dexcloud_core::ListingView) -> Vec<String> {
    panel_view.links().iter().map(|l| l.href.clone()).collect()
}

#[tokio::test]
async fn test_listing_renders_links_in_server_order() {
    let server = FakeServer::start(FakeState {
        file_list: (StatusCode::OK, json!({"userId": "42", "files": ["a.txt", "b.txt"]})),
        ..Default::default()
    })
    .await;
    let panel = FileTransferPanel::new(server.client());

    let view = panel.refresh().await;
    assert_eq!(hrefs(&view), ["/uploads/42/a.txt", "/uploads/42/b.txt"]);
    assert_eq!(panel.view().await, view);

    // Refreshing again does not duplicate entries
    let view = panel.refresh().await;
    assert_eq!(view.len(), 2);
}

#[tokio::test]
async fn test_empty_listing() {
    let server = FakeServer::start(FakeState {
        file_list: (StatusCode::OK, json!({"files": []})),
        ..Default::default()
    })
    .await;
    let panel = FileTransferPanel::new(server.client());

    assert!(panel.refresh().await.is_empty());
    assert!(panel.refresh().await.is_empty());
}

#[tokio::test]
async fn test_listing_failure_degrades_to_empty() {
    let server = FakeServer::start(FakeState {
        file_list: (StatusCode::OK, json!({"userId": "42", "files": ["a.txt"]})),
        ..Default::default()
    })
    .await;
    let panel = FileTransferPanel::new(server.client());
    assert_eq!(panel.refresh().await.len(), 1);

    server.with(|s| s.file_list = (StatusCode::UNAUTHORIZED, json!({"data": "Unauthorized"})));
    assert!(panel.refresh().await.is_empty());
    assert!(panel.view().await.is_empty());
}

#[tokio::test]
async fn test_listing_envelope_mismatch_is_empty() {
    let server = FakeServer::start(FakeState {
        file_list: (StatusCode::OK, json!({"userId": "42", "files": ["a.txt"]})),
        ..Default::default()
    })
    .await;

    let mut config = server.config();
    config.api.envelope = Envelope::Nested;
    let panel = FileTransferPanel::new(server.client_with(config));
    assert!(panel.refresh().await.is_empty());

    server.with(|s| {
        s.file_list = (
            StatusCode::OK,
            json!({"status": 200, "data": {"userid": 42, "files": ["c.txt"]}}),
        )
    });
    assert_eq!(hrefs(&panel.refresh().await), ["/uploads/42/c.txt"]);
}

#[tokio::test]
async fn test_listing_without_owner_is_empty() {
    let server = FakeServer::start(FakeState {
        file_list: (StatusCode::OK, json!({"files": ["a.txt"]})),
        ..Default::default()
    })
    .await;
    let panel = FileTransferPanel::new(server.client());

    let err = assert_err!(panel.try_fetch_listing().await);
    assert!(matches!(err, TransferError::InvalidResponse(_)));
    assert!(panel.refresh().await.is_empty());
}

#[tokio::test]
async fn test_listing_rejection_is_typed() {
    let server = FakeServer::start(FakeState {
        file_list: (StatusCode::UNAUTHORIZED, json!({"data": "Unauthorized"})),
        ..Default::default()
    })
    .await;
    let panel = FileTransferPanel::new(server.client());

    match assert_err!(panel.try_fetch_listing().await) {
        TransferError::Rejected(rejection) => assert_eq!(rejection.status, 401),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_upload_then_refresh() {
    let server = FakeServer::start(FakeState::default()).await;
    let panel = FileTransferPanel::new(server.client());
    assert!(panel.refresh().await.is_empty());

    server.with(|s| {
        s.upload_delay = Duration::from_millis(100);
        s.file_list = (StatusCode::OK, json!({"userId": "42", "files": ["a.txt", "b.bin"]}));
    });

    let view = assert_ok!(
        panel
            .upload(batch(&[("a.txt", b"alpha"), ("b.bin", b"\x00\x01\x02")]))
            .await
    );
    assert_eq!(hrefs(&view), ["/uploads/42/a.txt", "/uploads/42/b.bin"]);
    assert!(!panel.is_uploading());

    // The re-fetch starts only after the upload has answered
    assert_eq!(server.events(), ["filelist", "upload", "filelist"]);

    let parts = server.with(|s| s.uploads[0].clone());
    assert_eq!(
        parts,
        [
            ReceivedPart {
                field: "file".to_string(),
                file_name: Some("a.txt".to_string()),
                bytes: b"alpha".to_vec(),
            },
            ReceivedPart {
                field: "file".to_string(),
                file_name: Some("b.bin".to_string()),
                bytes: vec![0, 1, 2],
            },
        ]
    );
}

#[tokio::test]
async fn test_rejected_upload_leaves_list_alone() {
    let server = FakeServer::start(FakeState {
        upload_status: StatusCode::INTERNAL_SERVER_ERROR,
        file_list: (StatusCode::OK, json!({"userId": "42", "files": ["old.txt"]})),
        ..Default::default()
    })
    .await;
    let panel = FileTransferPanel::new(server.client());
    let before = panel.refresh().await;

    let err = assert_err!(panel.upload(batch(&[("new.txt", b"x")])).await);
    assert!(err.to_string().contains("500"));
    assert!(matches!(err, TransferError::Rejected(ref r) if r.status == 500));

    assert_eq!(panel.view().await, before);
    assert_eq!(server.events(), ["filelist", "upload"]);
    assert!(!panel.is_uploading());
}

#[tokio::test]
async fn test_second_upload_refused_while_first_in_flight() {
    let server = FakeServer::start(FakeState {
        upload_delay: Duration::from_millis(300),
        ..Default::default()
    })
    .await;
    let panel = Arc::new(FileTransferPanel::new(server.client()));

    let first = {
        let panel = Arc::clone(&panel);
        tokio::spawn(async move { panel.upload(batch(&[("one.txt", b"1")])).await })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(panel.is_uploading());
    let err = assert_err!(panel.upload(batch(&[("two.txt", b"2")])).await);
    assert!(matches!(err, TransferError::UploadInProgress));

    assert_ok!(first.await.unwrap());
    assert!(!panel.is_uploading());
    assert_eq!(server.with(|s| s.uploads.len()), 1);

    // Trigger is usable again once the first upload completed
    assert_ok!(panel.upload(batch(&[("two.txt", b"2")])).await);
    assert_eq!(server.with(|s| s.uploads.len()), 2);
}

#[tokio::test]
async fn test_upload_with_put() {
    let server = FakeServer::start(FakeState::default()).await;
    let mut config = server.config();
    config.api.upload_method = UploadMethod::Put;
    config.api.upload_field = "upload".to_string();
    let panel = FileTransferPanel::new(server.client_with(config));

    assert_ok!(panel.upload(batch(&[("a.txt", b"a")])).await);
    let parts = server.with(|s| s.uploads[0].clone());
    assert_eq!(parts[0].field, "upload");
}

#[tokio::test]
async fn test_download_listed_file() {
    let mut state = FakeState::default();
    state
        .downloads
        .insert("42/report 1.txt".to_string(), b"quarterly".to_vec());
    let server = FakeServer::start(state).await;
    let panel = FileTransferPanel::new(server.client());
    let dir = tempfile::tempdir().unwrap();

    let link = FileLink::new("/uploads", "42", "report 1.txt");
    let path = assert_ok!(panel.download(&link, dir.path()).await);
    assert_eq!(path, dir.path().join("report 1.txt"));
    assert_eq!(std::fs::read(&path).unwrap(), b"quarterly");

    let missing = FileLink::new("/uploads", "42", "gone.txt");
    let err = assert_err!(panel.download(&missing, dir.path()).await);
    assert!(matches!(err, TransferError::Rejected(ref r) if r.status == 404));
    assert!(!dir.path().join("gone.txt").exists());

    let sneaky = FileLink::new("/uploads", "42", "../escape.txt");
    let err = assert_err!(panel.download(&sneaky, dir.path()).await);
    assert!(matches!(err, TransferError::InvalidName(_)));
}

#[tokio::test]
async fn test_listing_sends_session_cookies() {
    let server = FakeServer::start(FakeState::default()).await;
    let api = server.client();
    api.store_session(&dexcloud_core::Session {
        user_id: "42".to_string(),
        token: "tok1".to_string(),
        expiry: None,
    })
    .await;

    FileTransferPanel::new(api).refresh().await;
    let sent = server.with(|s| s.cookies[0].clone());
    assert_eq!(sent.as_deref(), Some("token=tok1; userid=42"));
}
