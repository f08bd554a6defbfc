// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::detect::detect_handler;
use crate::config::DetectConfig;
use crate::vision::DetectionPipeline;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DetectionPipeline>,
}

impl AppState {
    pub fn new(pipeline: DetectionPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub version: String,
}

/// CORS for an explicit origin allow-list with credentials
///
/// Credentials rule out wildcard methods/headers, so both mirror the
/// preflight request instead.
pub fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Room for the JSON envelope and text queries around the image payload
const REQUEST_OVERHEAD_BYTES: usize = 256 * 1024;

/// Largest `/detect` body that can still carry an image of `max_image_bytes`
///
/// Base64 grows the payload by 4/3; anything bigger than this would fail the
/// decoder's size check anyway.
pub fn request_body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(REQUEST_OVERHEAD_BYTES)
}

/// Build the router: `POST /detect` and `GET /health`
///
/// The body limit follows the pipeline's `max_image_bytes` instead of axum's
/// 2 MB default.
pub fn create_app(state: AppState, cors_origins: Vec<HeaderValue>) -> Router {
    let body_limit = request_body_limit(state.pipeline.settings().max_image_bytes);

    Router::new()
        .route("/health", get(health_handler))
        .route("/detect", post(detect_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn start_server(config: &DetectConfig, pipeline: DetectionPipeline) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let app = create_app(AppState::new(pipeline), config.cors_header_values()?);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Detection API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.pipeline.detector_name(),
        version: crate::version::VERSION_NUMBER.to_string(),
    })
}
