//! Integration tests for the online synchronization path
//!
//! These run the task manager against a mocked backend and verify the
//! write-then-reload behavior and the failure policy.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use backend::{AuthClient, AuthUser, BackendClient, Session};
use common::config::BackendConfig;
use common::store::{LocalStore, keys};
use tasks::{Category, LocalTaskStore, RemoteTaskStore, Status, TaskDraft, TaskManager, TaskPatch};

const USER_ID: &str = "1f8e8d9a-2b4c-4a6e-9d3f-5c7b8a9e0f1a";

/// Online manager with a valid session already persisted
fn online_manager(server: &MockServer, dir: &TempDir) -> TaskManager {
    let store = LocalStore::new(dir.path().join("store"));

    let session = Session {
        access_token: "tok-1".to_string(),
        refresh_token: "refresh-1".to_string(),
        expires_at: Utc::now().timestamp() + 3600,
        user: AuthUser {
            id: USER_ID.parse().unwrap(),
            email: Some("mei@example.com".to_string()),
        },
    };
    store.save_private(keys::SESSION, &session).unwrap();

    let client = BackendClient::new(BackendConfig {
        project_url: server.uri(),
        anon_key: "anon-key".to_string(),
        client_info: "personal-life-assistant".to_string(),
    });
    let auth = AuthClient::new(client.clone(), store.clone());
    let remote = RemoteTaskStore::new(client, auth.clone());

    TaskManager::with_default_mode(remote, LocalTaskStore::new(store), &auth)
}

fn task_row(id: &str, title: &str, date: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": USER_ID,
        "title": title,
        "date": date,
        "time": null,
        "category": "life",
        "status": status,
        "work_start_time": null,
        "work_end_time": null,
        "created_at": "2026-08-31T12:00:00Z",
        "updated_at": "2026-08-31T12:00:00Z"
    })
}

async fn mock_users_row(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": USER_ID }])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_writes_then_reloads_full_list() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mock_users_row(&server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tasks"))
        .and(body_partial_json(json!({
            "user_id": USER_ID,
            "title": "buy rice",
            "status": "pending"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            task_row("t-1", "buy rice", "2026-09-01", "pending")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    // The reload after the write is a full, unscoped-by-date list.
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("user_id", format!("eq.{USER_ID}")))
        .and(query_param("order", "date.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_row("t-1", "buy rice", "2026-09-01", "pending")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut manager = online_manager(&server, &dir);
    assert!(manager.is_online());

    let id = manager
        .create(TaskDraft {
            title: "buy rice".to_string(),
            date: "2026-09-01".parse().unwrap(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(id, "t-1");
    let cached = manager.all();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].title, "buy rice");
}

#[tokio::test]
async fn test_remote_failure_reports_and_returns_none() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mock_users_row(&server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tasks"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "message": "backend down" })),
        )
        .mount(&server)
        .await;

    let mut manager = online_manager(&server, &dir);
    let reported = Arc::new(AtomicUsize::new(0));
    let seen = reported.clone();
    manager.on_error(move |operation, message| {
        assert_eq!(operation, "create");
        assert!(message.contains("backend down"));
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let id = manager
        .create(TaskDraft {
            title: "buy rice".to_string(),
            date: "2026-09-01".parse().unwrap(),
            ..Default::default()
        })
        .await;

    assert!(id.is_none());
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_load_failure_falls_back_to_local_store() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mock_users_row(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "unavailable" })))
        .mount(&server)
        .await;

    let mut manager = online_manager(&server, &dir);

    // Seed the fallback through the offline path first.
    manager.set_online(false);
    manager
        .create(TaskDraft {
            title: "cached task".to_string(),
            date: "2026-09-01".parse().unwrap(),
            ..Default::default()
        })
        .await
        .unwrap();
    manager.set_online(true);

    let reported = Arc::new(AtomicUsize::new(0));
    let seen = reported.clone();
    manager.on_error(move |operation, _| {
        assert_eq!(operation, "load");
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let tasks = manager.load().await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "cached task");
    assert_eq!(reported.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_toggle_sends_patch_with_flipped_status() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mock_users_row(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_row("t-1", "buy rice", "2026-09-01", "pending")
        ])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", "eq.t-1"))
        .and(query_param("user_id", format!("eq.{USER_ID}")))
        .and(body_partial_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_row("t-1", "buy rice", "2026-09-01", "completed")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut manager = online_manager(&server, &dir);
    manager.load().await;

    assert!(manager.toggle_status("t-1").await);
}

#[tokio::test]
async fn test_update_patch_uses_remote_column_names() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mock_users_row(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .and(body_partial_json(json!({ "work_start_time": "08:00:00" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            task_row("t-1", "shift", "2026-09-01", "pending")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut manager = online_manager(&server, &dir);
    let patch = TaskPatch {
        work_start: Some("08:00:00".parse().unwrap()),
        ..Default::default()
    };
    assert!(manager.update("t-1", patch).await);
}

#[tokio::test]
async fn test_signed_out_load_is_empty_not_an_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // No persisted session at all; build the manager by hand in
    // online mode to mimic a token that was cleared mid-session.
    let store = LocalStore::new(dir.path().join("store"));
    let client = BackendClient::new(BackendConfig {
        project_url: server.uri(),
        anon_key: "anon-key".to_string(),
        client_info: "personal-life-assistant".to_string(),
    });
    let auth = AuthClient::new(client.clone(), store.clone());
    let remote = RemoteTaskStore::new(client, auth);
    let mut manager = TaskManager::new(remote, LocalTaskStore::new(store), true);

    let tasks = manager.load().await;
    assert!(tasks.is_empty());
    assert!(manager.tasks_by_category(Category::Work).await.is_empty());
    assert_eq!(manager.tasks_by_status(Status::Pending).len(), 0);
}
