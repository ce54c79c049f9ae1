//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,

  /// The storefront or SMS webhook could not be reached, or answered with an
  /// error status.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("no sms webhook configured")]
  SmsNotConfigured,
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res = (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"reclaim\""),
        );
        res
      }
      Error::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
      Error::SmsNotConfigured => {
        (StatusCode::SERVICE_UNAVAILABLE, "sms not configured").into_response()
      }
    }
  }
}
