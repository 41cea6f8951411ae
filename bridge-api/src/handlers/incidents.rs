use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use bridge_common::ApiResponse;
use serde::Deserialize;

use crate::dto::IncidentsData;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct IncidentsQuery {
    limit: Option<usize>,
}

/// `GET /api/incidents?limit=N`: the CTO-Agent's recent incident ring,
/// newest first, capped at `MAX_LIMIT` regardless of what the caller asks for.
pub async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<IncidentsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let incidents = state.agent.incidents(limit);
    let data = IncidentsData {
        count: incidents.len(),
        incidents,
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
    async fn reports_empty_ring_on_a_fresh_agent() {
        let (state, ..) = test_state();
        let app = crate::routes::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/incidents?limit=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
