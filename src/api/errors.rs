// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::vision::DetectError;

/// Fixed `message` of every failed request
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Error body returned to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
    pub details: String,
}

/// Errors surfaced at the HTTP boundary
///
/// Every variant maps to a 500; the kinds only differ in logs.
#[derive(Debug, Clone)]
pub enum ApiError {
    Detection { kind: &'static str, message: String },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            ApiError::Detection { message, .. } => message.clone(),
            ApiError::InternalError(msg) => msg.clone(),
        };

        ErrorResponse {
            message: INTERNAL_ERROR_MESSAGE.to_string(),
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        500
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Detection { kind, .. } => *kind,
            ApiError::InternalError(_) => "internal",
        }
    }
}

impl From<DetectError> for ApiError {
    fn from(err: DetectError) -> Self {
        ApiError::Detection {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Detection { kind, message } => write!(f, "{} error: {}", kind, message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
