//! # Request Extractors
//!
//! Handlers take `Result<Json<T>, JsonRejection>` so malformed bodies map to
//! the structured `BAD_REQUEST` error instead of axum's plain-text rejection.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Unwrap a JSON body or convert the rejection into [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}
