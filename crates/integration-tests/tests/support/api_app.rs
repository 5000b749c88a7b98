use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use booking::booking::{BookingEngine, EngineSettings};
use booking::calendar::CalendarService;
use booking::repos::Store;
use chat_api::http::{AppState, RateLimiter, build_router};
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc, Weekday};
use serde_json::{Value, json};
use tower::ServiceExt;

pub fn build_test_router(store: Store, calendar: Option<Arc<dyn CalendarService>>) -> Router {
    let store = Arc::new(store);
    let engine = BookingEngine::new(
        store.clone(),
        store,
        calendar,
        EngineSettings {
            session_ttl_seconds: 86_400,
            business_time_zone: "Europe/Rome".to_string(),
            calendar_timeout: Duration::from_secs(2),
        },
    );

    build_router(AppState {
        engine,
        rate_limiter: RateLimiter::new(0),
        trusted_proxy_ips: HashSet::new(),
    })
}

pub async fn send_chat(app: &Router, session_id: &str, message: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "message": message, "sessionId": session_id, "language": "it" })
                        .to_string(),
                ))
                .expect("request should build"),
        )
        .await
        .expect("router should respond");

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// First Monday at least a week after today.
pub fn upcoming_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + ChronoDuration::days(7);
    while date.weekday() != Weekday::Mon {
        date += ChronoDuration::days(1);
    }
    date
}

pub fn day_first(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}
