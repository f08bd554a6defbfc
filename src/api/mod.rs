// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod http_server;

pub use detect::{DetectionRequest, DetectionResult};
pub use errors::{ApiError, ErrorResponse, INTERNAL_ERROR_MESSAGE};
pub use http_server::{create_app, start_server, AppState, HealthResponse};
