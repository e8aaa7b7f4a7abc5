#![allow(dead_code)]
use outreach_tracker::api::{self, MgmtState, ServiceContainer};
use outreach_tracker::config::{
    AnalyticsConfig, Config, LogFormat, ScoringConfig, ServerConfig, TelemetryConfig, TrackingConfig,
};
use outreach_tracker::domain::clock::{Clock, ManualClock};
use outreach_tracker::domain::record::ScoreWeights;
use outreach_tracker::services::tracker_service::TrackerService;
use serde_json::json;
use std::sync::{Arc, Once};
use time::OffsetDateTime;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("outreach_tracker=debug".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn get_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // 0 means let OS choose
            mgmt_port: 0,
            shutdown_timeout_secs: 1,
        },
        tracking: TrackingConfig {
            public_base_url: "https://track.example.com".parse().unwrap(),
            default_landing_url: "https://www.example.com/".to_string(),
        },
        scoring: ScoringConfig { open: 25, meeting_click: 50, general_click: 15, conversion: 100, cap: 100 },
        analytics: AnalyticsConfig { top_subjects: 5, default_window_days: 7, max_window_days: 3650 },
        telemetry: TelemetryConfig { otlp_endpoint: None, log_format: LogFormat::Text },
    }
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: reqwest::Client,
    pub tracker: TrackerService,
    pub config: Config,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = get_test_config();
        let tracker = TrackerService::new(ScoreWeights::from(config.scoring), config.analytics.top_subjects);
        Self::spawn_with(config, tracker).await
    }

    pub async fn spawn_with_clock(clock: ManualClock) -> Self {
        let config = get_test_config();
        let clock: Arc<dyn Clock> = Arc::new(clock);
        let tracker =
            TrackerService::with_clock(ScoreWeights::from(config.scoring), config.analytics.top_subjects, clock);
        Self::spawn_with(config, tracker).await
    }

    pub async fn spawn_with(config: Config, tracker: TrackerService) -> Self {
        setup_tracing();

        let services = ServiceContainer::with_tracker(&config, tracker.clone()).unwrap();
        let mgmt_app = api::mgmt_router(MgmtState { tracker: tracker.clone() });
        let app = api::app_router(config.clone(), services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        tokio::spawn(async move { axum::serve(mgmt_listener, mgmt_app).await.unwrap() });

        let client = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build().unwrap();

        Self { server_url, mgmt_url, client, tracker, config }
    }

    pub async fn send(&self, message_id: &str, subject: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/messages", self.server_url))
            .json(&json!({
                "messageId": message_id,
                "recipientAddress": format!("{}@prospect.example.com", message_id.to_lowercase()),
                "recipientName": "Samuel Hegge",
                "recipientOrg": "Singular",
                "subject": subject,
            }))
            .send()
            .await
            .unwrap()
    }

    pub async fn post_event(&self, message_id: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/v1/messages/{}/events", self.server_url, message_id))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get_json(&self, path: &str) -> (reqwest::StatusCode, serde_json::Value) {
        let resp = self.client.get(format!("{}{}", self.server_url, path)).send().await.unwrap();
        let status = resp.status();
        let body = resp.json().await.unwrap_or(serde_json::Value::Null);
        (status, body)
    }
}

pub fn rfc3339(at: OffsetDateTime) -> String {
    at.format(&time::format_description::well_known::Rfc3339).unwrap()
}
