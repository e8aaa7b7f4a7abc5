use crate::api::MgmtState;
use crate::api::schemas::health::HealthResponse;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

/// Liveness probe: returns 200 OK as long as the server is running.
pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness probe: the tracker is in memory, so readiness reports how many records it holds.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let response = HealthResponse { status: "ok".to_string(), records: state.tracker.len() };

    (StatusCode::OK, Json(response))
}
