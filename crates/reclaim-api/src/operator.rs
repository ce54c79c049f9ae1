//! Handlers for operator endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/status` | Engine snapshot with one entry per live session |
//! | `GET`  | `/sequences` | Active and recently finished, oldest first |
//! | `GET`  | `/sequences/{id}` | 404 if not found |
//! | `POST` | `/sequences/{id}/cancel` | `{"cancelled":false}` if already ended |
//! | `GET`  | `/stats` | Optional `?days=N` (default 30) |
//! | `POST` | `/pause`, `/resume` | Detection only; scheduled messages still fire |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use reclaim_core::{
  analytics::RecoveryStats,
  sequence::{Sequence, SequenceId},
};
use reclaim_engine::{EngineHandle, EngineStatus};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{error::ApiError, extract::ApiQuery};

const DEFAULT_STATS_DAYS: u32 = 30;

/// `GET /status`
pub async fn status(State(engine): State<EngineHandle>) -> Result<Json<EngineStatus>, ApiError> {
  Ok(Json(engine.status().await?))
}

// ─── Sequences ───────────────────────────────────────────────────────────────

/// `GET /sequences`
pub async fn list(State(engine): State<EngineHandle>) -> Result<Json<Vec<Sequence>>, ApiError> {
  Ok(Json(engine.sequences().await?))
}

/// `GET /sequences/{id}`
pub async fn get_one(
  State(engine): State<EngineHandle>,
  Path(id): Path<String>,
) -> Result<Json<Sequence>, ApiError> {
  let sequence = engine
    .sequence(SequenceId::from(id.clone()))
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("sequence {id} not found")))?;
  Ok(Json(sequence))
}

/// `POST /sequences/{id}/cancel`
pub async fn cancel(
  State(engine): State<EngineHandle>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
  let cancelled = engine.cancel_sequence(SequenceId::from(id)).await?;
  Ok(Json(json!({ "cancelled": cancelled })))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatsParams {
  pub days: Option<u32>,
}

/// `GET /stats[?days=N]`
pub async fn stats(
  State(engine): State<EngineHandle>,
  ApiQuery(params): ApiQuery<StatsParams>,
) -> Result<Json<RecoveryStats>, ApiError> {
  let days = params.days.unwrap_or(DEFAULT_STATS_DAYS);
  if days == 0 {
    return Err(ApiError::BadRequest("days must be at least 1".into()));
  }
  Ok(Json(engine.stats(days).await?))
}

// ─── Detection control ───────────────────────────────────────────────────────

/// `POST /pause`
pub async fn pause(State(engine): State<EngineHandle>) -> Result<StatusCode, ApiError> {
  engine.pause().await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /resume`
pub async fn resume(State(engine): State<EngineHandle>) -> Result<StatusCode, ApiError> {
  engine.resume().await?;
  Ok(StatusCode::NO_CONTENT)
}
