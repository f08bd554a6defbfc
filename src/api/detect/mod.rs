// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoint module
//!
//! Provides POST /detect for open-vocabulary detection.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::detect_handler;
pub use request::DetectionRequest;
pub use response::DetectionResult;
