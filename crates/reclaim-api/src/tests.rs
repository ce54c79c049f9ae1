//! Route tests against a running engine with in-memory capabilities.

use std::{convert::Infallible, sync::Arc};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{TimeDelta, TimeZone, Utc};
use reclaim_core::{
  capability::{CartSnapshotSource, Channel, NotificationSender, RenderedContent},
  cart::CartSnapshot,
  clock::ManualClock,
  session::SessionKey,
};
use reclaim_engine::{Engine, EngineHandle, RecoveryConfig, RunningEngine, memory::MemoryStore};
use serde_json::Value;
use tower::ServiceExt as _;

use crate::{operator_router, public_router};

struct StaticCart;

impl CartSnapshotSource for StaticCart {
  type Error = Infallible;

  async fn fetch_current(&self, _: &SessionKey) -> Result<CartSnapshot, Infallible> {
    Ok(CartSnapshot {
      token:             "abc".into(),
      item_count:        2,
      total_price_minor: 4000,
      items:             Vec::new(),
    })
  }
}

struct NullSender;

impl NotificationSender for NullSender {
  type Error = Infallible;

  async fn send(&self, _: Channel, _: &str, _: &RenderedContent) -> Result<(), Infallible> {
    Ok(())
  }
}

type Running = RunningEngine<StaticCart, NullSender, MemoryStore>;

fn start() -> (ManualClock, Running) {
  let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
  let engine = Engine::with_clock(
    RecoveryConfig::default(),
    Arc::new(StaticCart),
    Arc::new(NullSender),
    Arc::new(MemoryStore::new()),
    Arc::new(clock.clone()),
  );
  (clock, engine.start())
}

fn app(handle: EngineHandle) -> Router {
  Router::new()
    .merge(public_router(handle.clone()))
    .nest("/admin", operator_router(handle))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if body.is_some() {
    builder = builder.header(header::CONTENT_TYPE, "application/json");
  }
  let req = builder
    .body(Body::from(body.unwrap_or_default().to_owned()))
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

// ─── Shopper routes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn activity_accepts_known_signals() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let body = r#"{"session":"c1","signal":"key_input"}"#;
  let (status, _) = send(&app, "POST", "/activity", Some(body)).await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let body = r#"{"session":"c1","signal":"wiggle"}"#;
  let (status, body) = send(&app, "POST", "/activity", Some(body)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].as_str().unwrap().contains("signal"));
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let (status, body) = send(&app, "POST", "/activity", Some("{not json")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());

  // Missing content type.
  let req = Request::builder()
    .method("POST")
    .uri("/activity")
    .body(Body::from(r#"{"session":"c1","signal":"click"}"#))
    .unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(body["error"].is_string());

  let (status, body) = send(&app, "GET", "/admin/stats?days=soon", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn signals_require_a_session() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let (status, body) = send(&app, "POST", "/activity", Some(r#"{"signal":"click"}"#)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert!(body["error"].as_str().unwrap().contains("session"));

  let body = r#"{"session":"a b","path":"/cart"}"#;
  let (status, body) = send(&app, "POST", "/navigation", Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("session"));

  let (_, status) = send(&app, "GET", "/admin/status", None).await;
  assert_eq!(status["sessions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn sessions_are_reported_separately() {
  let (_clock, running) = start();
  let app = app(running.handle());

  send(&app, "POST", "/navigation", Some(r#"{"session":"c2","path":"/cart"}"#)).await;
  send(&app, "POST", "/activity", Some(r#"{"session":"c1","signal":"scroll"}"#)).await;

  let (_, body) = send(&app, "GET", "/admin/status", None).await;
  let sessions = body["sessions"].as_array().unwrap();
  assert_eq!(sessions.len(), 2);
  assert_eq!(sessions[0]["session"], "c1");
  assert_eq!(sessions[0]["page"], "");
  assert_eq!(sessions[1]["session"], "c2");
  assert_eq!(sessions[1]["page"], "/cart");
}

#[tokio::test]
async fn navigation_requires_absolute_path() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let body = r#"{"session":"c1","path":"/checkout"}"#;
  let (status, _) = send(&app, "POST", "/navigation", Some(body)).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, body) = send(&app, "GET", "/admin/status", None).await;
  assert_eq!(body["sessions"][0]["page"], "/checkout");

  let body = r#"{"session":"c1","path":"checkout"}"#;
  let (status, body) = send(&app, "POST", "/navigation", Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("path"));
}

#[tokio::test]
async fn contact_without_channel_is_rejected() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let body = r#"{"session":"c1","name":"Ada"}"#;
  let (status, _) = send(&app, "POST", "/contact", Some(body)).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let body = r#"{"session":"c1","email":"ada@example.com"}"#;
  let (status, _) = send(&app, "POST", "/contact", Some(body)).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, body) = send(&app, "GET", "/admin/status", None).await;
  assert_eq!(body["sessions"][0]["has_contact"], true);
}

// ─── Operator routes ─────────────────────────────────────────────────────────

#[tokio::test]
async fn sequence_lifecycle_over_http() {
  let (clock, running) = start();
  let handle = running.handle();
  let app = app(handle.clone());

  let body = r#"{"session":"c1","email":"ada@example.com"}"#;
  send(&app, "POST", "/contact", Some(body)).await;
  clock.advance(TimeDelta::minutes(31));
  handle.tick().await.unwrap();

  let (status, list) = send(&app, "GET", "/admin/sequences", None).await;
  assert_eq!(status, StatusCode::OK);
  let sequences = list.as_array().unwrap();
  assert_eq!(sequences.len(), 1);
  assert_eq!(sequences[0]["status"], "active");
  let id = sequences[0]["id"].as_str().unwrap().to_owned();

  let (status, one) = send(&app, "GET", &format!("/admin/sequences/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(one["cart"]["token"], "abc");

  let (_, body) = send(&app, "POST", &format!("/admin/sequences/{id}/cancel"), None).await;
  assert_eq!(body["cancelled"], true);
  let (_, body) = send(&app, "POST", &format!("/admin/sequences/{id}/cancel"), None).await;
  assert_eq!(body["cancelled"], false);

  let (_, stats) = send(&app, "GET", "/admin/stats?days=7", None).await;
  assert_eq!(stats["abandoned"], 1);
  assert_eq!(stats["cancelled"], 1);
  assert_eq!(stats["window_days"], 7);
}

#[tokio::test]
async fn unknown_sequence_is_404() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let (status, _) = send(&app, "GET", "/admin/sequences/cart_nope_1", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send(&app, "POST", "/admin/sequences/cart_nope_1/cancel", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_default_window_and_validation() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let (status, stats) = send(&app, "GET", "/admin/stats", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["window_days"], 30);
  assert_eq!(stats["recovery_rate"], 0.0);

  let (status, _) = send(&app, "GET", "/admin/stats?days=0", None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pause_and_resume() {
  let (_clock, running) = start();
  let app = app(running.handle());

  let (status, _) = send(&app, "POST", "/admin/pause", None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, body) = send(&app, "GET", "/admin/status", None).await;
  assert_eq!(body["paused"], true);

  send(&app, "POST", "/admin/resume", None).await;
  let (_, body) = send(&app, "GET", "/admin/status", None).await;
  assert_eq!(body["paused"], false);
}
