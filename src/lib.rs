// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod version;
pub mod vision;

pub use api::{create_app, AppState, DetectionRequest, DetectionResult};
pub use config::DetectConfig;
pub use vision::{
    BoundingBox, DetectError, Detection, DetectionPipeline, Detector, GroupDetections,
    PipelineSettings, SummaryScope,
};
