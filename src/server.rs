//! Public intake API.
//!
//! The POST endpoint only enqueues: it returns 202 Accepted once the queue
//! API acknowledges the send, with no guarantee the submission has been
//! persisted yet. Validation and persistence happen later in the worker.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::model::SubmissionKind;
use crate::queue::QueueClient;

/// One inbound queue handle per submission kind, injected at startup.
pub struct AppState {
    queues: HashMap<SubmissionKind, Arc<dyn QueueClient>>,
}

impl AppState {
    pub fn new(queues: HashMap<SubmissionKind, Arc<dyn QueueClient>>) -> Self {
        Self { queues }
    }

    fn queue(&self, kind: SubmissionKind) -> Option<&Arc<dyn QueueClient>> {
        self.queues.get(&kind)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/submissions/:kind", post(submit))
        .route("/health", get(healthcheck))
        .with_state(state)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    let Ok(kind) = kind.parse::<SubmissionKind>() else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown submission kind" })),
        );
    };
    // Every configured kind has a queue; a miss here is a wiring bug.
    let Some(queue) = state.queue(kind) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown submission kind" })),
        );
    };

    let body = match serde_json::to_string(&fields) {
        Ok(body) => body,
        Err(err) => {
            error!(?err, "failed to serialize submission");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "serialization failed" })),
            );
        }
    };

    if let Err(err) = queue.send(&body).await {
        error!(?err, kind = %kind, queue = queue.name(), "enqueue failed");
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": "enqueue failed" })),
        );
    }

    info!(kind = %kind, queue = queue.name(), "submission accepted");
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}
