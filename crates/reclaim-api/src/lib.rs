//! JSON REST API for Reclaim.
//!
//! Exposes two axum [`Router`]s backed by a running engine's
//! [`EngineHandle`]: the shopper-facing signal routes and the operator
//! routes. Auth, TLS, and transport concerns are the caller's responsibility;
//! the operator router is expected to sit behind authentication.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", reclaim_api::public_router(handle.clone()))
//! .nest("/api/admin", reclaim_api::operator_router(handle).layer(auth))
//! ```

pub mod error;
pub mod extract;
pub mod operator;
pub mod shopper;

use axum::{
  Router,
  routing::{get, post},
};
use reclaim_engine::EngineHandle;

pub use error::ApiError;

/// Routes the storefront page calls on behalf of the shopper.
pub fn public_router(handle: EngineHandle) -> Router<()> {
  Router::new()
    .route("/activity", post(shopper::activity))
    .route("/navigation", post(shopper::navigation))
    .route("/contact", post(shopper::contact))
    .with_state(handle)
}

/// Inspection and control routes for operators.
pub fn operator_router(handle: EngineHandle) -> Router<()> {
  Router::new()
    .route("/status", get(operator::status))
    // Sequences
    .route("/sequences", get(operator::list))
    .route("/sequences/{id}", get(operator::get_one))
    .route("/sequences/{id}/cancel", post(operator::cancel))
    // Analytics
    .route("/stats", get(operator::stats))
    // Detection control
    .route("/pause", post(operator::pause))
    .route("/resume", post(operator::resume))
    .with_state(handle)
}

#[cfg(test)]
mod tests;
