//! HTTP host for the Reclaim recovery engine.
//!
//! Wires the engine to the storefront through [`http`] adapters and exposes
//! the `reclaim-api` routers, with the operator routes behind Basic auth.

pub mod auth;
pub mod error;
pub mod http;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use reclaim_engine::{EngineHandle, RecoveryConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_operator};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `RECLAIM_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  #[serde(default = "default_store_path")]
  pub store_path:           PathBuf,
  pub auth_username:        String,
  pub auth_password_hash:   String,
  /// Where SMS messages are posted. Without it every SMS send fails.
  #[serde(default)]
  pub sms_webhook:          Option<String>,
  #[serde(default = "default_http_timeout")]
  pub http_timeout_seconds: u64,
  /// The `[recovery]` table; every field is optional.
  #[serde(default)]
  pub recovery:             RecoveryConfig,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("reclaim.db") }

fn default_http_timeout() -> u64 { 10 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the auth middleware.
#[derive(Clone)]
pub struct AppState {
  pub engine: EngineHandle,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Shopper signals under `/api`, operator routes under `/admin`.
pub fn router(state: AppState) -> Router {
  let operator = reclaim_api::operator_router(state.engine.clone())
    .layer(middleware::from_fn_with_state(state.clone(), require_operator));

  Router::new()
    .nest("/api", reclaim_api::public_router(state.engine.clone()))
    .nest("/admin", operator)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
