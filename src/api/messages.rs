use crate::api::AppState;
use crate::api::schemas::messages::{ConversionRequest, EngagementEventRequest, EventKind, RecordSentRequest};
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// Registers a message the send path has just delivered.
///
/// # Errors
/// Returns `AppError::BadRequest` if the payload is invalid.
/// Returns `AppError::DuplicateRecord` if the message id is already tracked.
pub async fn record_sent(State(state): State<AppState>, Json(payload): Json<RecordSentRequest>) -> Result<impl IntoResponse> {
    payload.validate().map_err(AppError::BadRequest)?;

    let record = state.tracker.record_sent(payload.into_new_message())?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Records a conversion (e.g. a booked meeting) for a message.
///
/// # Errors
/// Returns `AppError::NotFound` if the message is unknown.
/// Returns `AppError::InvalidEvent` if the conversion predates the send.
pub async fn record_conversion(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    payload: Option<Json<ConversionRequest>>,
) -> Result<impl IntoResponse> {
    let occurred_at = payload.and_then(|Json(p)| p.occurred_at).unwrap_or_else(|| state.tracker.now());

    if state.tracker.record_converted_at(&message_id, occurred_at)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// Applies an engagement event reported by the email provider.
///
/// # Errors
/// Returns `AppError::NotFound` if the message is unknown.
/// Returns `AppError::InvalidEvent` if the event predates the send.
pub async fn record_event(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Json(event): Json<EngagementEventRequest>,
) -> Result<impl IntoResponse> {
    let tracker = &state.tracker;
    let at = event.occurred_at.unwrap_or_else(|| tracker.now());

    let known = match event.kind {
        EventKind::Open => tracker.record_opened_at(&message_id, at)?,
        EventKind::Click => tracker.record_clicked_at(&message_id, event.link_kind(), at)?,
        EventKind::Conversion => tracker.record_converted_at(&message_id, at)?,
    };

    if known { Ok(StatusCode::NO_CONTENT) } else { Err(AppError::NotFound) }
}

/// Returns the raw engagement record for a message.
///
/// # Errors
/// Returns `AppError::NotFound` if the message is unknown.
pub async fn get_record(State(state): State<AppState>, Path(message_id): Path<String>) -> Result<impl IntoResponse> {
    Ok(Json(state.tracker.get_record(&message_id)?))
}

/// Returns the per-message performance report.
///
/// # Errors
/// Returns `AppError::NotFound` if the message is unknown.
pub async fn get_performance(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.tracker.get_performance(&message_id)?))
}
