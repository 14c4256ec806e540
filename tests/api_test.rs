mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::FakeQueue;
use directory_ingest::db;
use directory_ingest::model::SubmissionKind;
use directory_ingest::queue::QueueClient;
use directory_ingest::server::{router, AppState};
use directory_ingest::worker::{Worker, WorkerSettings};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn build_app() -> (axum::Router, HashMap<SubmissionKind, Arc<FakeQueue>>) {
    let mut fakes = HashMap::new();
    let mut queues: HashMap<SubmissionKind, Arc<dyn QueueClient>> = HashMap::new();
    for kind in SubmissionKind::ALL {
        let fake = FakeQueue::new(kind.as_str());
        let client: Arc<dyn QueueClient> = fake.clone();
        queues.insert(kind, client);
        fakes.insert(kind, fake);
    }
    (router(Arc::new(AppState::new(queues))), fakes)
}

fn form_request(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn submission_is_accepted_and_enqueued() {
    let (app, fakes) = build_app();

    // data={"company_name":"Acme"}
    let response = app
        .oneshot(form_request(
            "/submissions/enrolment",
            "data=%7B%22company_name%22%3A%22Acme%22%7D",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let sent = fakes[&SubmissionKind::Enrolment].sent().await;
    assert_eq!(sent.len(), 1);

    // The queued body is the JSON-encoded form dictionary.
    let envelope: Value = serde_json::from_str(&sent[0]).unwrap();
    assert_eq!(envelope["data"], json!(r#"{"company_name":"Acme"}"#));
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
    let (app, fakes) = build_app();

    let response = app
        .oneshot(form_request("/submissions/export", "data=%7B%7D"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for fake in fakes.values() {
        assert!(fake.sent().await.is_empty());
    }
}

#[tokio::test]
async fn healthcheck_is_ok() {
    let (app, _fakes) = build_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Full pipeline: accepted form post, queued envelope, worker persistence.
#[tokio::test]
async fn accepted_submission_is_eventually_persisted() {
    let (app, fakes) = build_app();

    let response = app
        .oneshot(form_request(
            "/submissions/registration",
            "data=%7B%22company_number%22%3A%2212345678%22%7D",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Feed the queued body to a worker, the way SQS would deliver it.
    let inbound = FakeQueue::new("registration");
    let invalid = FakeQueue::new("registration-invalid");
    let sent = fakes[&SubmissionKind::Registration].sent().await;
    let message_id = inbound.push(&sent[0]).await;

    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    let inbound_client: Arc<dyn QueueClient> = inbound.clone();
    let invalid_client: Arc<dyn QueueClient> = invalid.clone();
    let worker = Worker::new(
        SubmissionKind::Registration,
        pool.clone(),
        inbound_client,
        invalid_client,
        WorkerSettings {
            wait_time_seconds: 1,
            max_messages: 10,
        },
    );
    let batch = inbound.receive(1, 10).await.unwrap();
    worker.process(&batch[0]).await.unwrap();

    let stored = db::fetch_by_message_id(&pool, SubmissionKind::Registration, &message_id)
        .await
        .unwrap()
        .expect("row should exist");
    assert_eq!(stored.data, json!({"company_number": "12345678"}));
}
