use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bridge_common::ApiResponse;
use bridge_dlo::DloError;
use tracing::warn;

use crate::dto::{DloListData, PurgeData};
use crate::state::AppState;

/// `GET /api/dlo`: the current Dead Letter Office contents, newest first,
/// with `body` always redacted.
pub async fn list_dlo(State(state): State<AppState>) -> impl IntoResponse {
    let dead_letters = state.dlo.list();
    let data = DloListData {
        count: dead_letters.len(),
        dead_letters,
    };
    (StatusCode::OK, Json(ApiResponse::ok("ok", data))).into_response()
}

/// `DELETE /api/dlo`: purges every dead letter, returning the count removed.
pub async fn purge_dlo(State(state): State<AppState>) -> impl IntoResponse {
    let purged = state.dlo.purge();
    (
        StatusCode::OK,
        Json(ApiResponse::ok("dlo purged", PurgeData { purged })),
    )
        .into_response()
}

/// `POST /api/dlo/{sms_id}/retry`: resets the dead letter's retry state and
/// re-admits it to the queue. Per §4.5, if the queue refuses the record
/// (e.g. it's full), the letter goes right back into the DLO instead of
/// being dropped.
pub async fn retry_dlo(
    State(state): State<AppState>,
    Path(sms_id): Path<String>,
) -> impl IntoResponse {
    let record = match state.dlo.retry(&sms_id.as_str().into()) {
        Ok(record) => record,
        Err(DloError::NotFound) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiResponse::<()>::error("dead letter not found")),
            )
                .into_response()
        }
    };

    match state.queue.enqueue(record.clone()) {
        Ok(depth) => (
            StatusCode::OK,
            Json(ApiResponse::ok(
                "message requeued",
                crate::dto::SubmitMessageData {
                    sms_id: record.sms_id.to_string(),
                    queue_depth: depth,
                },
            )),
        )
            .into_response(),
        Err(e) => {
            warn!(sms_id = %record.sms_id, error = %e, "dlo retry could not be re-enqueued, returning to DLO");
            state.dlo.readmit(record, e.to_string());
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
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn retry_of_unknown_id_is_not_found() {
        let (state, ..) = test_state();
        let app = crate::routes::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/dlo/missing/retry")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn purge_reports_the_removed_count() {
        let (state, _telegram, _email, dlo) = test_state();
        dlo.capture(
            bridge_common::MessageRecord {
                sms_id: "sms-1".into(),
                sender: "+10000000000".into(),
                body: "123456".into(),
                timestamp: 0,
                node_id: "node-1".into(),
                priority: bridge_common::Priority::Normal,
                encrypted: false,
                retry_count: 5,
                last_error: None,
                created_at: 0,
            },
            "exhausted retries".into(),
        );
        let app = crate::routes::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/dlo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(dlo.len(), 0);
    }
}
