use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bridge_common::{now_secs, ApiResponse, MessageRecord};
use bridge_queue::EnqueueError;
use tracing::warn;

use crate::dto::SubmitMessageData;
use crate::state::AppState;
use crate::validation::validate_message;

/// `POST /api/sms/inbound`: validates the inbound Message Record and
/// admits it to the queue. `sms_id`, `sender`, and `node_id` are checked
/// per §4.8; `retry_count`/`last_error`/`created_at` are always
/// server-assigned regardless of what the caller sent.
pub async fn submit_message(
    State(state): State<AppState>,
    Json(mut record): Json<MessageRecord>,
) -> impl IntoResponse {
    if let Err(e) = validate_message(&record, state.envelope.as_deref()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error(e.to_string())),
        )
            .into_response();
    }

    record.created_at = now_secs();
    record.retry_count = 0;
    record.last_error = None;

    let sms_id = record.sms_id.to_string();
    match state.queue.enqueue(record) {
        Ok(depth) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                "message queued",
                SubmitMessageData {
                    sms_id,
                    queue_depth: depth,
                },
            )),
        )
            .into_response(),
        Err(EnqueueError::QueueFull | EnqueueError::Stopped | EnqueueError::Duplicate) => {
            warn!(sms_id = %sms_id, "queue rejected inbound message");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::<()>::error("queue_full")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn accepts_valid_message() {
        let (state, _telegram, _email, _dlo) = test_state();
        let app = crate::routes::router(state);

        let body = json!({
            "sms_id": "sms-1",
            "sender": "+10000000000",
            "body": "123456",
            "timestamp": 0,
            "node_id": "node-1"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sms/inbound")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_empty_sender() {
        let (state, _telegram, _email, _dlo) = test_state();
        let app = crate::routes::router(state);

        let body = json!({
            "sms_id": "sms-1",
            "sender": "",
            "body": "123456",
            "timestamp": 0,
            "node_id": "node-1"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sms/inbound")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
