//! Handlers for the shopper-facing signal endpoints.
//!
//! Every body names the shopper's browsing `session`; the storefront script
//! sends the value of its `cart` cookie.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `POST` | `/activity`   | `{"session":"…","signal":"click"}` |
//! | `POST` | `/navigation` | `{"session":"…","path":"/products/mug"}` |
//! | `POST` | `/contact`    | `{"session":"…","email":"…","phone":"…","name":"…"}` |

use axum::{extract::State, http::StatusCode};
use reclaim_core::{contact::ContactInfo, session::SessionKey};
use reclaim_engine::{EngineHandle, activity::ActivitySignal};
use serde::Deserialize;

use crate::{error::ApiError, extract::ApiJson};

fn session(key: SessionKey) -> Result<SessionKey, ApiError> {
  if key.is_valid() {
    Ok(key)
  } else {
    Err(ApiError::BadRequest("session must be a non-blank cookie value".into()))
  }
}

#[derive(Debug, Deserialize)]
pub struct ActivityBody {
  pub session: SessionKey,
  pub signal:  ActivitySignal,
}

/// `POST /activity`
pub async fn activity(
  State(engine): State<EngineHandle>,
  ApiJson(body): ApiJson<ActivityBody>,
) -> Result<StatusCode, ApiError> {
  engine.record_activity(session(body.session)?, body.signal).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct NavigationBody {
  pub session: SessionKey,
  pub path:    String,
}

/// `POST /navigation`
pub async fn navigation(
  State(engine): State<EngineHandle>,
  ApiJson(body): ApiJson<NavigationBody>,
) -> Result<StatusCode, ApiError> {
  let key = session(body.session)?;
  if !body.path.starts_with('/') {
    return Err(ApiError::BadRequest("path must start with '/'".into()));
  }
  engine.navigate(key, body.path).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ContactBody {
  pub session: SessionKey,
  #[serde(flatten)]
  pub contact: ContactInfo,
}

/// `POST /contact`. The stored contact is not echoed back.
pub async fn contact(
  State(engine): State<EngineHandle>,
  ApiJson(body): ApiJson<ContactBody>,
) -> Result<StatusCode, ApiError> {
  engine.capture_contact(session(body.session)?, body.contact).await?;
  Ok(StatusCode::NO_CONTENT)
}
