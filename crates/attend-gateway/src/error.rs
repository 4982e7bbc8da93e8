// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of engine errors onto HTTP responses.

use attend_core::AttendError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable description.
    pub error: String,
    /// Stable machine-readable code.
    pub code: &'static str,
}

/// An [`AttendError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub AttendError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AttendError::NotFound { .. } => StatusCode::NOT_FOUND,
            AttendError::Forbidden(_) => StatusCode::FORBIDDEN,
            AttendError::Conflict(_) => StatusCode::CONFLICT,
            AttendError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AttendError::Transient { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AttendError::Config(_) | AttendError::Storage { .. } | AttendError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AttendError> for ApiError {
    fn from(err: AttendError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
            // Storage internals stay in the log.
            match &self.0 {
                AttendError::Transient { .. } => "storage temporarily unavailable, retry".to_string(),
                _ => "internal error".to_string(),
            }
        } else {
            self.0.to_string()
        };
        (
            status,
            Json(ErrorResponse {
                error,
                code: self.0.code(),
            }),
        )
            .into_response()
    }
}
