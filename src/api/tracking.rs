use crate::api::AppState;
use crate::api::schemas::tracking::{ClickQuery, TrackingLinksRequest, TrackingLinksResponse, safe_redirect_target};
use crate::domain::record::LinkKind;
use crate::error::{AppError, Result};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
};

/// 1x1 transparent GIF served by the open-tracking endpoint.
pub static TRACKING_PIXEL: [u8; 42] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff,
    0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02,
    0x01, 0x44, 0x00, 0x3b,
];

/// Open-tracking pixel. Always answers with the image, whatever the tracker says.
pub async fn track_open(State(state): State<AppState>, Path(message_id): Path<String>) -> impl IntoResponse {
    match state.tracker.record_opened(&message_id) {
        Ok(true) => {}
        Ok(false) => tracing::debug!(%message_id, "Open pixel for unknown message"),
        Err(e) => tracing::warn!(error = %e, "Open pixel event rejected"),
    }

    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate, max-age=0"),
        ],
        TRACKING_PIXEL.as_slice(),
    )
}

/// Click tracking. Records the click, then redirects to the target or the default landing page.
pub async fn track_click(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Query(query): Query<ClickQuery>,
) -> impl IntoResponse {
    let kind = query.link_type.as_deref().map_or(LinkKind::General, LinkKind::parse_lenient);

    match state.tracker.record_clicked(&message_id, kind) {
        Ok(true) => {}
        Ok(false) => tracing::debug!(%message_id, "Click for unknown message"),
        Err(e) => tracing::warn!(error = %e, "Click event rejected"),
    }

    let landing = &state.config.tracking.default_landing_url;
    let target = match query.url.as_deref() {
        Some(raw) => safe_redirect_target(raw).unwrap_or_else(|| {
            tracing::warn!(%message_id, "Refusing to redirect to unsafe click target");
            landing.clone()
        }),
        None => landing.clone(),
    };

    Redirect::to(&target)
}

/// Builds the tracked pixel and click URLs for a message.
///
/// # Errors
/// Returns `AppError::BadRequest` if the message id is blank or the target is not a safe URL.
pub async fn create_tracking_links(
    State(state): State<AppState>,
    Json(payload): Json<TrackingLinksRequest>,
) -> Result<impl IntoResponse> {
    let target = payload
        .target_url
        .as_deref()
        .map(|raw| {
            safe_redirect_target(raw)
                .ok_or_else(|| AppError::BadRequest("targetUrl must be an http(s) URL or a path".into()))
        })
        .transpose()?;
    let kind = payload.link_kind.as_deref().map_or(LinkKind::General, LinkKind::parse_lenient);

    let open_pixel_url =
        state.links.open_pixel_url(&payload.message_id).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let click_url = state
        .links
        .click_url(&payload.message_id, target.as_deref(), kind)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(TrackingLinksResponse { open_pixel_url: open_pixel_url.into(), click_url: click_url.into() }))
}
