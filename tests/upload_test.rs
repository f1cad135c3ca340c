use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use rust_upload_progress::config::ServerConfig;
use rust_upload_progress::services::notifier::{ON_UPLOAD_EVENT, RoomHub};
use rust_upload_progress::services::storage::{PersistenceSink, WriteTarget};
use rust_upload_progress::{AppState, create_app};
use serde_json::{Value, json};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n",
        boundary = BOUNDARY,
        field = field,
        filename = filename
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn state_for(folder: &Path, hub: Arc<RoomHub>) -> AppState {
    let mut config = ServerConfig::development().with_downloads_folder(folder);
    config.progress_interval = Duration::ZERO;
    AppState::new(config, hub)
}

#[tokio::test]
async fn test_upload_flow() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Arc::new(RoomHub::new(1024));
    let mut room = hub.join("10");
    let app = create_app(state_for(dir.path(), hub.clone()));

    // 1. Directory starts empty
    let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());

    // 2. Upload a file large enough to arrive in several chunks
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    let response = app
        .clone()
        .oneshot(upload_request(
            "/?socketId=10",
            multipart_body("photo", "joker-editor.png", &content),
        ))
        .await
        .unwrap();

    let status = response.status();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    if status != StatusCode::OK {
        panic!(
            "Upload failed with status {}: {:?}",
            status,
            String::from_utf8_lossy(&body)
        );
    }
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, json!({ "result": "File uploaded with success!" }));

    // 3. Stored bytes are identical
    let stored = tokio::fs::read(dir.path().join("joker-editor.png"))
        .await
        .unwrap();
    assert_eq!(stored.len(), content.len());
    assert_eq!(stored, content);

    // 4. Progress reached the room, cumulative and non-decreasing
    let mut processed = Vec::new();
    while let Ok(n) = room.try_recv() {
        if n.event == ON_UPLOAD_EVENT {
            assert_eq!(n.payload["filename"], "joker-editor.png");
            processed.push(n.payload["processedAlready"].as_u64().unwrap());
        }
    }
    assert!(!processed.is_empty());
    assert!(processed.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*processed.last().unwrap(), content.len() as u64);

    // 5. The list endpoint reports the file
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["file"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["joker-editor.png"]);
    assert_eq!(json[0]["size"], "300 kB");
}

#[tokio::test]
async fn test_upload_without_session_still_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let hub = Arc::new(RoomHub::new(16));
    let app = create_app(state_for(dir.path(), hub.clone()));

    let response = app
        .oneshot(upload_request(
            "/",
            multipart_body("file", "test.txt", b"Hello, this is a test file content!"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(hub.room_count(), 0);
    let stored = tokio::fs::read_to_string(dir.path().join("test.txt"))
        .await
        .unwrap();
    assert_eq!(stored, "Hello, this is a test file content!");
}

#[tokio::test]
async fn test_upload_path_traversal_stays_in_folder() {
    let root = tempfile::tempdir().unwrap();
    let folder = root.path().join("downloads");
    tokio::fs::create_dir(&folder).await.unwrap();
    let app = create_app(state_for(&folder, Arc::new(RoomHub::new(16))));

    let response = app
        .oneshot(upload_request(
            "/?socketId=01",
            multipart_body("file", "../../../etc/passwd", b"Safe content"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(folder.join("passwd").exists());
    assert!(!root.path().join("passwd").exists());
}

#[tokio::test]
async fn test_upload_without_boundary_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(state_for(dir.path(), Arc::new(RoomHub::new(16))));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/?socketId=10")
                .header(header::CONTENT_TYPE, "multipart/form-data")
                .body(Body::from("some file bytes"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());
    assert!(json.get("result").is_none());
}

#[tokio::test]
async fn test_truncated_body_is_not_reported_as_success() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(state_for(dir.path(), Arc::new(RoomHub::new(16))));

    // closing boundary never arrives
    let mut body = multipart_body("file", "cut.bin", b"0123456789");
    body.truncate(body.len() - BOUNDARY.len() - 8);

    let response = app
        .oneshot(upload_request("/?socketId=10", body))
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::OK);
}

struct ReadOnlyDisk;

#[async_trait]
impl PersistenceSink for ReadOnlyDisk {
    async fn open(&self, folder: &Path, _file_name: &str) -> io::Result<WriteTarget> {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("{} is read-only", folder.display()),
        ))
    }
}

#[tokio::test]
async fn test_storage_failure_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState {
        sink: Arc::new(ReadOnlyDisk),
        ..state_for(dir.path(), Arc::new(RoomHub::new(16)))
    };
    let app = create_app(state);

    let response = app
        .oneshot(upload_request(
            "/?socketId=10",
            multipart_body("file", "test.txt", b"content"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Internal Server Error");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = state_for(dir.path(), Arc::new(RoomHub::new(16)));
    state.config.max_request_size = 1024;
    let app = create_app(state);

    let response = app
        .oneshot(upload_request(
            "/?socketId=10",
            multipart_body("file", "big.bin", &vec![7u8; 64 * 1024]),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
