// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handler

use axum::{extract::State, Json};
use tracing::{debug, error};

use super::request::DetectionRequest;
use super::response::DetectionResult;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// POST /detect - Detect objects matching free-text labels
///
/// # Request
/// - `image_data`: Base64-encoded JPEG or PNG
/// - `texts`: Text groups, e.g. `[["cat", "dog"], ["remote control"]]`
///
/// # Response
/// - `detections`: Formatted detection strings
/// - `image_with_boxes`: Base64 JPEG with every group's boxes drawn in
///
/// # Errors
/// - 500 Internal Server Error: decode, inference or encoding failed
pub async fn detect_handler(
    State(state): State<AppState>,
    Json(request): Json<DetectionRequest>,
) -> Result<Json<DetectionResult>, ApiError> {
    debug!(
        "Detect request: {} groups, {} queries, {} base64 chars",
        request.texts.len(),
        request.query_count(),
        request.image_data.len()
    );

    // Decode, inference and encoding are all CPU-bound
    let pipeline = state.pipeline.clone();
    let output = tokio::task::spawn_blocking(move || {
        pipeline.run(&request.image_data, &request.texts)
    })
    .await
    .map_err(|e| {
        error!("Detection task panicked or was cancelled: {}", e);
        ApiError::InternalError(format!("Detection task failed: {}", e))
    })?
    .map_err(|e| {
        error!("Detection failed ({}): {}", e.kind(), e);
        ApiError::from(e)
    })?;

    Ok(Json(output.into()))
}
