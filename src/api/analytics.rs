use crate::api::AppState;
use crate::api::schemas::analytics::AnalyticsQuery;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

/// Aggregate engagement analytics over a trailing window.
///
/// # Errors
/// Returns `AppError::BadRequest` if `windowDays` is out of range.
pub async fn get_analytics(State(state): State<AppState>, Query(query): Query<AnalyticsQuery>) -> Result<impl IntoResponse> {
    let limits = state.config.analytics;
    let window_days =
        query.resolve(limits.default_window_days, limits.max_window_days).map_err(AppError::BadRequest)?;

    Ok(Json(state.tracker.compute_analytics(window_days)))
}
