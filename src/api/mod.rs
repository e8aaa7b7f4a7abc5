use crate::config::Config;
use crate::domain::record::ScoreWeights;
use crate::domain::tracking::{TrackingLinks, TrackingUrlError};
use crate::services::tracker_service::TrackerService;
use axum::body::Body;
use axum::http::{HeaderName, Request};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod analytics;
pub mod health;
pub mod messages;
pub mod schemas;
pub mod tracking;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub tracker: TrackerService,
    pub links: TrackingLinks,
}

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub tracker: TrackerService,
}

/// Long-lived services, built once at startup and shared by both routers.
#[derive(Clone, Debug)]
pub struct ServiceContainer {
    pub tracker: TrackerService,
    pub links: TrackingLinks,
}

impl ServiceContainer {
    /// # Errors
    /// Returns an error if the configured public base URL cannot host tracking paths.
    pub fn new(config: &Config) -> Result<Self, TrackingUrlError> {
        let tracker = TrackerService::new(ScoreWeights::from(config.scoring), config.analytics.top_subjects);
        Self::with_tracker(config, tracker)
    }

    /// # Errors
    /// Returns an error if the configured public base URL cannot host tracking paths.
    pub fn with_tracker(config: &Config, tracker: TrackerService) -> Result<Self, TrackingUrlError> {
        let links = TrackingLinks::new(config.tracking.public_base_url.clone())?;
        Ok(Self { tracker, links })
    }
}

/// Configures and returns the public router.
pub fn app_router(config: Config, services: ServiceContainer) -> Router {
    let state = AppState { config, tracker: services.tracker, links: services.links };

    // Pixel and redirect endpoints are embedded in emails and stay unversioned
    let tracking_routes = Router::new()
        .route("/track/open/{messageId}", get(tracking::track_open))
        .route("/track/click/{messageId}", get(tracking::track_click));

    let api_routes = Router::new()
        .route("/messages", post(messages::record_sent))
        .route("/messages/{messageId}", get(messages::get_record))
        .route("/messages/{messageId}/events", post(messages::record_event))
        .route("/messages/{messageId}/conversion", post(messages::record_conversion))
        .route("/messages/{messageId}/performance", get(messages::get_performance))
        .route("/analytics", get(analytics::get_analytics))
        .route("/tracking-links", post(tracking::create_tracking_links));

    tracking_routes
        .nest("/v1", api_routes)
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .and_then(|id| id.header_value().to_str().ok())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = response.status();
                        span.record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER), MakeRequestUuid))
        .with_state(state)
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new().route("/livez", get(health::livez)).route("/readyz", get(health::readyz)).with_state(state)
}
