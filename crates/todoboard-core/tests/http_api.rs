mod common;

use std::time::Duration;

use common::{record_toasts, token};
use todoboard_core::api::{ApiSettings, HttpTodoApi, TodoApi};
use todoboard_core::filter::TodoFilter;
use todoboard_core::store::CREATED_MESSAGE;
use todoboard_core::{ListState, Notifier, StoreError, TodoStore};
use todoboard_shared::{Severity, TodoId, TodoStatus, UpsertTodo};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> HttpTodoApi {
    let mut settings = ApiSettings::new(server.uri());
    settings.timeout = Duration::from_secs(5);
    HttpTodoApi::new(&settings).expect("build client")
}

fn todo_json(id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("Todo {id}"),
        "description": null,
        "status": status,
        "dueDate": null,
        "tags": ["board"]
    })
}

#[tokio::test]
async fn list_sends_token_and_filter_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/todos"))
        .and(header("authorization", "Bearer test-token"))
        .and(header_exists("x-request-id"))
        .and(query_param("status", "PENDING"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "todos": [todo_json("t1", "PENDING")],
            "total": 1,
            "page": 1,
            "limit": 20,
            "totalPages": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = TodoStore::new(api_for(&server), Notifier::new());
    let filter = TodoFilter {
        status: Some(TodoStatus::Pending),
        ..TodoFilter::default()
    };
    let token = token();
    let state = store
        .list_todos(&filter, Some(&token))
        .await
        .expect("list todos");
    let ListState::Ready(result) = state else {
        panic!("expected a ready list");
    };
    assert_eq!(result.total_pages, 1);
    assert_eq!(result.todos[0].id.as_str(), "t1");

    // Cached: the mock's expect(1) verifies no second request on drop.
    store
        .list_todos(&filter, Some(&token))
        .await
        .expect("cached list");
}

#[tokio::test]
async fn due_range_is_serialized_as_date_and_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/todos"))
        .and(query_param("dueStart", "2024-05-01"))
        .and(query_param_exists_ending("dueEnd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "todos": [],
            "total": 0,
            "page": 1,
            "limit": 20,
            "totalPages": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let filter = TodoFilter {
        due_start: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
        due_end: chrono::NaiveDate::from_ymd_opt(2024, 5, 31),
        ..TodoFilter::default()
    };
    let params = filter.to_query_params().expect("params");
    api_for(&server)
        .list_todos(&params, &token())
        .await
        .expect("list todos");
}

fn query_param_exists_ending(key: &'static str) -> impl wiremock::Match {
    move |request: &wiremock::Request| {
        request
            .url
            .query_pairs()
            .any(|(k, v)| k == key && v.ends_with(":59.999Z"))
    }
}

#[tokio::test]
async fn update_puts_to_item_with_matching_body_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/auth/todos/t1"))
        .and(body_partial_json(serde_json::json!({
            "id": "t1",
            "status": "COMPLETED",
            "tags": ["board"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(todo_json("t1", "COMPLETED")))
        .expect(1)
        .mount(&server)
        .await;

    let mut payload = UpsertTodo::new("Todo t1", TodoStatus::Completed);
    payload.id = Some(TodoId::from("t1"));
    payload.tags = vec!["board".to_string()];
    let updated = api_for(&server)
        .update_todo(&TodoId::from("t1"), &payload, None)
        .await
        .expect("update");
    assert_eq!(updated.status, TodoStatus::Completed);
}

#[tokio::test]
async fn delete_accepts_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/auth/todos/t9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    api_for(&server)
        .delete_todo(&TodoId::from("t9"), Some(&token()))
        .await
        .expect("delete");
}

#[tokio::test]
async fn server_error_becomes_status_error_without_toast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/todos"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;

    let store = TodoStore::new(api_for(&server), Notifier::new());
    let toasts = record_toasts(store.notifier());
    let err = store
        .create_todo(&UpsertTodo::new("Plan sprint", TodoStatus::Pending), None)
        .await
        .expect_err("create should fail");

    match err {
        StoreError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "database down");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(toasts.lock().is_empty());
    assert_eq!(store.invalidations(), 0);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/todos"))
        .respond_with(ResponseTemplate::new(201).set_body_string("{not json"))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .create_todo(&UpsertTodo::new("x", TodoStatus::Pending), None)
        .await
        .expect_err("decode should fail");
    assert!(matches!(err, StoreError::Decode { .. }));
}

#[tokio::test]
async fn create_round_trip_announces_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/todos"))
        .and(body_partial_json(serde_json::json!({
            "title": "Plan sprint",
            "status": "PENDING"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(todo_json("t3", "PENDING")))
        .expect(1)
        .mount(&server)
        .await;

    let store = TodoStore::new(api_for(&server), Notifier::new());
    let toasts = record_toasts(store.notifier());
    let created = store
        .create_todo(&UpsertTodo::new("Plan sprint", TodoStatus::Pending), None)
        .await
        .expect("create");
    assert_eq!(created.id.as_str(), "t3");
    assert_eq!(
        toasts.lock().as_slice(),
        &[(CREATED_MESSAGE.to_string(), Severity::Success)]
    );
}
