use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{dlo, health, incidents, inbound, metrics, telemetry};
use crate::state::AppState;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Assembles the Ingest Facade's routes (§4.8): inbound submission,
/// telemetry ingest, and the read-only operator surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/sms/inbound", post(inbound::submit_message))
        .route("/api/telemetry", post(telemetry::submit_telemetry))
        .route("/api/health", get(health::get_health))
        .route("/api/metrics", get(metrics::get_metrics))
        .route(
            "/api/dlo",
            get(dlo::list_dlo).delete(dlo::purge_dlo),
        )
        .route("/api/dlo/{sms_id}/retry", post(dlo::retry_dlo))
        .route("/api/incidents", get(incidents::list_incidents))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let (state, ..) = test_state();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
