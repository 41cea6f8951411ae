use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bridge_common::ApiResponse;

use crate::dto::{
    AgentMetricsDto, DloMetricsDto, EmailMetricsDto, MetricsData, QueueMetricsDto, TelegramMetricsDto,
};
use crate::state::AppState;

/// `GET /api/metrics`: the full counter set from §4 — queue, both
/// dispatchers, the DLO, and the CTO-Agent.
pub async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let queue_metrics = state.queue.metrics();

    let data = MetricsData {
        queue: QueueMetricsDto {
            total_enqueued: queue_metrics.total_enqueued,
            total_delivered: queue_metrics.total_delivered,
            total_failed: queue_metrics.total_failed,
            current_depth: queue_metrics.current_depth,
            running: queue_metrics.running,
            consumers: queue_metrics.consumers,
        },
        telegram: TelegramMetricsDto {
            total_sent: state.telegram.total_sent(),
            total_rate_limited: state.telegram.total_rate_limited(),
            total_errors: state.telegram.total_errors(),
            connected: state.telegram.connected(),
            rate_limited: state.telegram.rate_limited(),
        },
        email: EmailMetricsDto {
            total_sent: state.email.total_sent(),
            total_errors: state.email.total_errors(),
        },
        dlo: DloMetricsDto {
            count: state.dlo.len(),
            dlo_overflow: state.dlo.dlo_overflow(),
        },
        agent: AgentMetricsDto {
            total_suppressed: state.agent.total_suppressed(),
            total_delivered: state.agent.total_delivered(),
            total_failed: state.agent.total_failed(),
        },
    };

    (StatusCode::OK, Json(ApiResponse::ok("ok", data))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn reports_zeroed_counters_on_a_fresh_queue() {
        let (state, ..) = test_state();
        let app = crate::routes::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
