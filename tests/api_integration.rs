//! End-to-end tests driving the full router over an in-memory event source.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use event_chat_gateway::api;
use event_chat_gateway::app_state::{AppState, ServiceSettings};
use event_chat_gateway::domain::Event;
use event_chat_gateway::error::GatewayError;
use event_chat_gateway::upstream::{
    ChatMessage, CompletionClient, CompletionOptions, InMemoryEventSource,
};

const DAY: i64 = 86_400_000;
const HOUR: i64 = 3_600_000;
/// 2023-11-14T00:00:00Z
const DAY_ONE: i64 = 1_699_920_000_000;
const MUSIC: &str = "%E9%9F%B3%E6%A8%82";

#[derive(Debug)]
struct StubLlm;

#[async_trait]
impl CompletionClient for StubLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _options: CompletionOptions,
    ) -> Result<String, GatewayError> {
        if messages.iter().any(|m| m.content.contains("intent label")) {
            Ok("search_events".to_string())
        } else {
            Ok("```json\n{\"city\": \"台北\", \"category\": \"音樂\", \"num\": 99}\n```".to_string())
        }
    }
}

fn event(id: &str, city: &str, category: &str, start: i64) -> Event {
    Event {
        id: id.to_string(),
        name: format!("Event {id}"),
        location: Some(city.to_string()),
        category: Some(category.to_string()),
        start_time: start,
        end_time: Some(start + HOUR),
        ..Event::default()
    }
}

fn fixture() -> Vec<Event> {
    vec![
        event("1", "臺北", "音樂", DAY_ONE + HOUR),
        event("2", "高雄", "音樂", DAY_ONE + 3 * DAY + HOUR),
        event("3", "臺北", "音樂", DAY_ONE + 10 * DAY),
        event("4", "臺中", "展覽", DAY_ONE + 2 * DAY),
        event("5", "臺北", "音樂", 1_710_000_000_000),
    ]
}

fn app(llm: Option<Arc<dyn CompletionClient>>) -> Router {
    let state = AppState::new(
        Arc::new(InMemoryEventSource::new(fixture())),
        llm,
        ServiceSettings {
            timezone: chrono_tz::UTC,
            default_per_page: 5,
            analytics_fetch_limit: 1_000,
        },
    );
    api::build_router().with_state(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let Ok(response) = app.oneshot(request).await;
    let status = response.status();
    let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
        panic!("body read failed");
    };
    let Ok(json) = serde_json::from_slice::<Value>(&bytes) else {
        panic!("body is not JSON: {}", String::from_utf8_lossy(&bytes));
    };
    (status, json)
}

async fn get(uri: &str) -> (StatusCode, Value) {
    let Ok(request) = Request::get(uri).body(Body::empty()) else {
        panic!("bad request");
    };
    send(app(None), request).await
}

async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let Ok(request) = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
    else {
        panic!("bad request");
    };
    send(app, request).await
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn intervals_are_listed() {
    let (status, body) = get("/config/intervals").await;
    assert_eq!(status, StatusCode::OK);
    let Some(intervals) = body.as_array() else {
        panic!("expected an array");
    };
    assert_eq!(intervals.len(), 5);
    assert_eq!(intervals[2]["interval"], "1d");
}

#[tokio::test]
async fn search_pages_through_matching_events() {
    let (status, body) = get(&format!("/api/v1/events?category={MUSIC}&num=2&p=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_events"], 4);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["pagination"]["current_page"], 2);
    assert_eq!(body["events"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["events"][0]["id"], "3");
    assert_eq!(body["search_params"]["page"], "2");
    assert_eq!(body["search_params"]["sort"], "start_time");
}

#[tokio::test]
async fn search_rejects_zero_page_size() {
    let (status, body) = get("/api/v1/events?num=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1004);
}

#[tokio::test]
async fn search_rejects_inverted_range() {
    let (status, body) = get("/api/v1/events?from=20&to=10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1002);
}

#[tokio::test]
async fn recommend_accepts_typed_json_values() {
    let (status, body) = post(
        app(None),
        "/api/v1/recommend",
        r#"{"city": "臺北", "num": 1, "asc": false, "sort": "start_time"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total_events"], 3);
    assert_eq!(body["events"][0]["id"], "5");
}

#[tokio::test]
async fn category_histogram_counts_only_matching_events() {
    let (status, body) = get(&format!(
        "/api/v1/activity/histogram?category={MUSIC}&from=1699900000000&to=1705000000000"
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([{"key": "音樂", "value": 3}]));
}

#[tokio::test]
async fn histogram_rejects_unknown_group() {
    let (status, body) = get("/api/v1/activity/histogram?group=venue").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1005);
}

#[tokio::test]
async fn daily_histogram_fills_gaps() {
    let to = DAY_ONE + 3 * DAY + 2 * HOUR;
    let (status, body) = get(&format!(
        "/api/v1/activity/date-histogram?interval=1d&timezone=UTC&from={DAY_ONE}&to={to}&city=%E9%AB%98%E9%9B%84,%E8%87%BA%E5%8C%97"
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    let Some(buckets) = body.as_array() else {
        panic!("expected an array");
    };
    let values: Vec<i64> = buckets.iter().filter_map(|b| b["value"].as_i64()).collect();
    assert_eq!(values, vec![1, 0, 0, 1]);
}

#[tokio::test]
async fn oversized_date_histogram_is_rejected() {
    let (status, body) =
        get("/api/v1/activity/date-histogram?interval=1m&from=0&to=86400000&num=10").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1009);
}

#[tokio::test]
async fn huge_bucket_cap_is_rejected() {
    let (status, body) = get(
        "/api/v1/activity/date-histogram?interval=1m&num=1000000000000&from=0&to=8000000000000000",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1006);
}

#[tokio::test]
async fn geographic_analysis_includes_chart() {
    let (status, body) = get("/api/v1/analysis/geographic").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_events"], 5);
    assert_eq!(body["buckets"][0]["key"], "臺北");
    let Some(chart) = body["chart"].as_str() else {
        panic!("chart missing");
    };
    assert!(chart.starts_with("data:image/svg+xml;base64,"));
}

#[tokio::test]
async fn monthly_trend_has_six_months() {
    let reference = DAY_ONE + 20 * DAY;
    let (status, body) = get(&format!("/api/v1/analysis/monthly?reference={reference}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monthly"].as_array().map(Vec::len), Some(6));
}

#[tokio::test]
async fn chat_rejects_empty_message() {
    let (status, body) = post(app(None), "/api/v1/chat", r#"{"message": "   "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1000);
}

#[tokio::test]
async fn chat_search_sanitizes_llm_parameters() {
    let llm: Arc<dyn CompletionClient> = Arc::new(StubLlm);
    let (status, body) = post(
        app(Some(llm)),
        "/api/v1/chat",
        r#"{"message": "台北有什麼音樂活動", "page": "1",
            "search_params": {"sort": "start_time", "asc": "false"}}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "search_events");
    assert_eq!(body["search_params"]["city"], "臺北");
    assert_eq!(body["search_params"]["category"], "音樂");
    assert_eq!(body["search_params"]["num"], "5");
    assert_eq!(body["search_params"]["asc"], "false");
    assert_eq!(body["pagination"]["total_events"], 3);
    assert_eq!(body["events"][0]["id"], "5");
    assert_eq!(body["stage"], "opening");
    assert_eq!(body["follow_up"]["stage"], "opening");
}

#[tokio::test]
async fn chat_greets_without_llm() {
    let (status, body) = post(app(None), "/api/v1/chat", r#"{"message": "你好"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "greeting");
    assert!(body.get("events").is_none());
}

#[tokio::test]
async fn conversation_stage_reads_the_history() {
    let (status, body) = post(
        app(None),
        "/api/v1/conversation-stage",
        r#"{"chat_history": [
            {"role": "user", "content": "找音樂活動"},
            {"role": "assistant", "content": "Found 3 events; showing 3 on page 1 of 1."},
            {"role": "user", "content": "謝謝，再見"}
        ]}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "closing");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn empty_history_is_at_the_opening() {
    let llm: Arc<dyn CompletionClient> = Arc::new(StubLlm);
    let (status, body) = post(app(Some(llm)), "/api/v1/conversation-stage", "{}").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stage"], "opening");
}
