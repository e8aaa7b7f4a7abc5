use outreach_tracker::domain::clock::ManualClock;
use reqwest::StatusCode;
use serde_json::json;
use time::Duration;
use time::macros::datetime;

mod common;

#[tokio::test]
async fn test_record_sent_returns_fresh_record() {
    let app = common::TestApp::spawn().await;

    let resp = app.send("SENT1", "Quick question").await;

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["messageId"], "SENT1");
    assert_eq!(body["subject"], "Quick question");
    assert_eq!(body["score"], 0);
    assert_eq!(body["openedAt"], serde_json::Value::Null);
    assert!(body["sentAt"].is_string());
}

#[tokio::test]
async fn test_record_sent_generates_id_when_absent() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/v1/messages", app.server_url))
        .json(&json!({
            "recipientAddress": "samuel@singular.net",
            "recipientName": "Samuel Hegge",
            "subject": "Quick question",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    let id = body["messageId"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(body["recipientOrg"], "");
}

#[tokio::test]
async fn test_duplicate_send_is_conflict_and_keeps_original() {
    let app = common::TestApp::spawn().await;
    app.send("DUP1", "Original").await;

    let resp = app.send("DUP1", "Replacement").await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Message already recorded: DUP1");
    assert_eq!(app.tracker.get_record("DUP1").unwrap().subject, "Original");
}

#[tokio::test]
async fn test_invalid_send_payload() {
    let app = common::TestApp::spawn().await;

    let resp = app
        .client
        .post(format!("{}/v1/messages", app.server_url))
        .json(&json!({
            "recipientAddress": "not-an-address",
            "recipientName": "Samuel Hegge",
            "subject": "Quick question",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(app.tracker.is_empty());
}

#[tokio::test]
async fn test_full_funnel_scenario() {
    let t0 = datetime!(2026-10-01 09:00 UTC);
    let clock = ManualClock::new(t0);
    let app = common::TestApp::spawn_with_clock(clock.clone()).await;
    app.send("E1", "Quick question").await;

    clock.advance(Duration::hours(1));
    let resp = app.client.get(format!("{}/track/open/E1", app.server_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    clock.advance(Duration::hours(1));
    let resp = app
        .client
        .get(format!("{}/track/click/E1", app.server_url))
        .query(&[("url", "https://calendly.com/demo"), ("type", "meeting")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    clock.advance(Duration::hours(1));
    let resp = app.client.post(format!("{}/v1/messages/E1/conversion", app.server_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (status, body) = app.get_json("/v1/messages/E1/performance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 100);
    assert_eq!(body["sentAt"], common::rfc3339(t0));
    assert_eq!(body["openedAt"], common::rfc3339(t0 + Duration::hours(1)));
    assert_eq!(body["clickedAt"], common::rfc3339(t0 + Duration::hours(2)));
    assert_eq!(body["convertedAt"], common::rfc3339(t0 + Duration::hours(3)));
    assert_eq!(body["timeToConversionSecs"], 3 * 3600);
}

#[tokio::test]
async fn test_webhook_events_with_timestamps() {
    let t0 = datetime!(2026-10-01 09:00 UTC);
    let clock = ManualClock::new(t0);
    let app = common::TestApp::spawn_with_clock(clock.clone()).await;
    app.send("WH1", "Quick question").await;
    clock.advance(Duration::days(1));

    let opened = t0 + Duration::minutes(30);
    let resp = app.post_event("WH1", json!({ "kind": "open", "occurredAt": common::rfc3339(opened) })).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // duplicate delivery is absorbed
    let resp = app.post_event("WH1", json!({ "kind": "open", "occurredAt": common::rfc3339(opened) })).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.post_event("WH1", json!({ "kind": "click", "linkKind": "brochure" })).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let (_, body) = app.get_json("/v1/messages/WH1").await;
    assert_eq!(body["openedAt"], common::rfc3339(opened));
    assert_eq!(body["clickedAt"], common::rfc3339(t0 + Duration::days(1)));
    assert_eq!(body["score"], 40);
}

#[tokio::test]
async fn test_event_before_send_is_rejected() {
    let t0 = datetime!(2026-10-01 09:00 UTC);
    let app = common::TestApp::spawn_with_clock(ManualClock::new(t0)).await;
    app.send("EARLY1", "Quick question").await;

    let before = common::rfc3339(t0 - Duration::hours(1));
    let resp = app.post_event("EARLY1", json!({ "kind": "conversion", "occurredAt": before })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .client
        .post(format!("{}/v1/messages/EARLY1/conversion", app.server_url))
        .json(&json!({ "occurredAt": before }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let record = app.tracker.get_record("EARLY1").unwrap();
    assert!(record.converted_at.is_none());
    assert_eq!(record.score, 0);
}

#[tokio::test]
async fn test_unknown_message_is_not_found() {
    let app = common::TestApp::spawn().await;

    let resp = app.post_event("nonexistent", json!({ "kind": "open" })).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app.client.post(format!("{}/v1/messages/nonexistent/conversion", app.server_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let (status, body) = app.get_json("/v1/messages/nonexistent/performance").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let (status, _) = app.get_json("/v1/messages/nonexistent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(app.tracker.is_empty());
}

#[tokio::test]
async fn test_unknown_event_kind_is_rejected() {
    let app = common::TestApp::spawn().await;
    app.send("KIND1", "Quick question").await;

    let resp = app.post_event("KIND1", json!({ "kind": "bounce" })).await;

    assert!(resp.status().is_client_error());
    assert_eq!(app.tracker.get_record("KIND1").unwrap().score, 0);
}
