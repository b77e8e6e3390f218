#![cfg(feature = "http_api")]

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Value, json};
use std::time::Duration;
use study_hub::chat::{ChatClient, ChatError, ChatRequest, FALLBACK_REPLY};
use study_hub::config::SharedStore;
use study_hub::{Dashboard, MemoryStore, StatusTicker, Timetable, http_api};
use tower::util::ServiceExt;

struct Echo;

impl ChatClient for Echo {
    async fn send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        if request.prompt == "fail" {
            return Err(ChatError::Api {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(format!("echo: {}", request.prompt))
    }
}

/// Answers after a short delay.
struct Slow;

impl ChatClient for Slow {
    async fn send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(format!("late: {}", request.prompt))
    }
}

// 2025-01-05 is a Sunday
fn sunday_at(h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 5)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

fn sunday_morning() -> NaiveDateTime {
    sunday_at(10, 0)
}

fn new_router() -> axum::Router {
    let store: SharedStore = Box::new(MemoryStore::new());
    let dashboard = Dashboard::load(store).with_student_name("Ana");
    let state = http_api::AppState::new(dashboard, Echo).with_clock(sunday_morning);
    http_api::router(state)
}

async fn call(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_and_status() {
    let app = new_router();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["type"], "upcoming");
    assert_eq!(body["status"]["minutesUntil"], 60);
    assert_eq!(body["status"]["class"]["code"], "MKT 2127");
    assert_eq!(body["nextClass"]["code"], "GED 1117");

    let (_, body) = call(&app, "GET", "/schedule", None).await;
    assert_eq!(body.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn attendance_marking_via_http_api() {
    let app = new_router();
    let payload = json!({ "courseCode": "MAT 1110", "present": true });
    let (status, body) = call(&app, "POST", "/attendance", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "recorded");
    // date defaults to the clock's day
    assert_eq!(body["key"], "MAT 1110-2025-01-05");
    assert_eq!(body["course"]["percentage"], 100);

    // same mark again clears it
    let (_, body) = call(&app, "POST", "/attendance", Some(payload)).await;
    assert_eq!(body["outcome"], "cleared");
    assert_eq!(body["course"]["total"], 0);

    let (status, body) = call(
        &app,
        "POST",
        "/attendance/MAT%201110/manual",
        Some(json!({ "increment": true, "present": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "added");
    assert_eq!(body["course"]["absent"], 1);

    let (status, body) = call(&app, "GET", "/attendance/MAT%201110", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Basic Math");
    assert_eq!(body["percentage"], 0);
    assert_eq!(body["safeSkips"], 0);

    let (_, body) = call(&app, "GET", "/attendance", None).await;
    assert_eq!(body["totals"]["total"], 1);
    assert_eq!(body["courses"].as_array().unwrap().len(), 4);

    let (status, body) = call(&app, "GET", "/attendance/ACC%201010", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn grades_and_gpa_via_http_api() {
    let app = new_router();
    let (_, body) = call(&app, "GET", "/gpa", None).await;
    assert_eq!(body["gpa"], "3.750");

    for (kind, score) in [("Continuous", 25.0), ("Mid-term", 22.0), ("Final", 35.0)] {
        let (status, body) = call(
            &app,
            "POST",
            "/grades",
            Some(json!({ "courseCode": "MAT 1110", "type": kind, "score": score })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["type"], kind);
    }

    let (_, body) = call(&app, "GET", "/gpa", None).await;
    assert_eq!(body["gpa"], "3.781");
    assert_eq!(body["courses"][0]["letter"], "A+");

    let (status, body) = call(
        &app,
        "POST",
        "/grades",
        Some(json!({ "courseCode": "MAT 1110", "type": "Final", "score": 45 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");

    let (status, _) = call(
        &app,
        "POST",
        "/grades",
        Some(json!({ "courseCode": "MAT 1110", "type": "Essay", "score": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, grades) = call(&app, "GET", "/grades", None).await;
    let id = grades[0]["id"].as_str().unwrap().to_string();
    let (status, _) = call(&app, "DELETE", &format!("/grades/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "DELETE", &format!("/grades/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assignment_lifecycle_via_http_api() {
    let app = new_router();
    let (status, created) = call(
        &app,
        "POST",
        "/assignments",
        Some(json!({ "title": "Case study", "courseCode": "MKT 2127", "dueDate": "2025-01-20" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["type"], "Assignment");
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "PUT", &format!("/assignments/{id}/toggle"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let (_, list) = call(&app, "GET", "/assignments", None).await;
    assert_eq!(list[0]["status"], "completed");

    let (status, _) = call(&app, "DELETE", &format!("/assignments/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "PUT", &format!("/assignments/{id}/toggle"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_via_http_api() {
    let app = new_router();
    let (status, reply) = call(&app, "POST", "/chat", Some(json!({ "message": "hi" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["role"], "assistant");
    assert_eq!(reply["content"], "echo: hi");

    let (_, reply) = call(&app, "POST", "/chat", Some(json!({ "message": "fail" }))).await;
    assert_eq!(reply["content"], FALLBACK_REPLY);

    let (status, _) = call(&app, "POST", "/chat", Some(json!({ "message": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, history) = call(&app, "GET", "/chat", None).await;
    assert_eq!(history.as_array().unwrap().len(), 4);

    let (status, _) = call(&app, "DELETE", "/chat", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, history) = call(&app, "GET", "/chat", None).await;
    assert!(history.as_array().unwrap().is_empty());

    let (status, tips) = call(&app, "GET", "/tips/BIS%202122", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tips["subject"], "Computer Applications");
}

#[tokio::test]
async fn preferences_via_http_api() {
    let app = new_router();
    let (_, prefs) = call(&app, "GET", "/preferences", None).await;
    assert_eq!(prefs["darkMode"], false);
    assert_eq!(prefs["greeting"], "Good morning, Ana!");

    let (status, prefs) = call(
        &app,
        "PUT",
        "/preferences",
        Some(json!({ "darkMode": true, "personalNote": "One step at a time" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prefs["darkMode"], true);
    assert_eq!(prefs["personalNote"], "One step at a time");
}

#[tokio::test]
async fn status_is_served_from_the_ticker() {
    let ticker = StatusTicker::new(Timetable::default(), sunday_at(11, 15));
    let store: SharedStore = Box::new(MemoryStore::new());
    let state = http_api::AppState::new(Dashboard::load(store), Echo)
        .with_clock(sunday_morning)
        .with_ticker(&ticker);
    let app = http_api::router(state);

    let (status, body) = call(&app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["type"], "active");
    assert_eq!(body["status"]["class"]["code"], "MKT 2127");

    ticker.refresh(sunday_at(18, 0));
    let (_, body) = call(&app, "GET", "/status", None).await;
    assert_eq!(body["status"]["type"], "free");
}

#[tokio::test]
async fn chat_reply_lands_after_the_caller_disconnects() {
    let store: SharedStore = Box::new(MemoryStore::new());
    let state = http_api::AppState::new(Dashboard::load(store), Slow).with_clock(sunday_morning);
    let app = http_api::router(state);

    let gone = tokio::time::timeout(
        Duration::from_millis(5),
        call(&app, "POST", "/chat", Some(json!({ "message": "first" }))),
    )
    .await;
    assert!(gone.is_err());

    // still outstanding
    let (status, body) = call(&app, "POST", "/chat", Some(json!({ "message": "second" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let (_, history) = call(&app, "GET", "/chat", None).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
    assert_eq!(history[1]["content"], "late: first");

    let (status, reply) = call(&app, "POST", "/chat", Some(json!({ "message": "third" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["content"], "late: third");
}
