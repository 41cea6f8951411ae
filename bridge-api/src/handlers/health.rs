use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bridge_common::{now_secs, ApiResponse};

use crate::dto::{HealthComponents, HealthData, NodesComponent, QueueComponent, TelegramComponent};
use crate::state::AppState;

/// `GET /api/health`: overall status plus per-component detail. `status`
/// is `"ok"` only when the queue is running, the primary channel is
/// reachable, and no tracked node is stale.
pub async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    let depth = state.queue.depth();
    let capacity = state.queue.capacity();
    let running = state.queue.is_running();
    let connected = state.telegram.connected();
    let rate_limited = state.telegram.rate_limited();
    let tracked = state.health.node_count();
    let stale = state.health.stale_node_count();

    let status = if running && connected && stale == 0 {
        "ok"
    } else {
        "degraded"
    };

    let data = HealthData {
        status,
        timestamp: now_secs(),
        components: HealthComponents {
            queue: QueueComponent {
                depth,
                capacity,
                running,
            },
            telegram: TelegramComponent {
                connected,
                rate_limited,
            },
            nodes: NodesComponent { tracked, stale },
        },
    };

    (StatusCode::OK, Json(ApiResponse::ok(status, data))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn reports_ok_with_no_nodes_and_running_queue() {
        let (state, ..) = test_state();
        state.queue.start(1);
        let app = crate::routes::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
