//! Extractors whose rejections use the API's `{"error": …}` shape.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, Query},
};

use crate::error::ApiError;

/// [`Json`] with rejections reported as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// [`Query`] with rejections reported as [`ApiError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
