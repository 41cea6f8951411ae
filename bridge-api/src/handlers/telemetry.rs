use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bridge_common::{now_secs, ApiResponse, NodeTelemetrySample};

use crate::state::AppState;

/// `POST /api/telemetry`: records a node's telemetry sample. `received_at`
/// is always server-assigned on receipt, per §3.
pub async fn submit_telemetry(
    State(state): State<AppState>,
    Json(mut sample): Json<NodeTelemetrySample>,
) -> impl IntoResponse {
    if sample.node_id.as_str().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<()>::error("node_id must not be empty")),
        )
            .into_response();
    }

    sample.received_at = now_secs();
    state.health.ingest(sample);

    (
        StatusCode::OK,
        Json(ApiResponse::<()>::ok_empty("telemetry recorded")),
    )
        .into_response()
}
