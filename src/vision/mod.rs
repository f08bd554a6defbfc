// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Open-vocabulary object detection
//!
//! This module provides:
//! - Base64 image decoding and JPEG re-encoding
//! - OWLv2 inference behind the [`Detector`] trait
//! - Box rendering and textual summaries
//! - The [`DetectionPipeline`] tying them together

pub mod detector;
pub mod image_utils;
pub mod owlv2;
pub mod pipeline;
pub mod render;
pub mod summary;

pub use detector::{
    non_max_suppression, BoundingBox, DetectError, Detection, Detector, GroupDetections,
};
pub use image_utils::{
    decode_base64_image, decode_image_bytes, detect_format, encode_jpeg, encode_jpeg_base64,
    ImageError, ImageInfo,
};
pub use pipeline::{DetectionPipeline, PipelineOutput, PipelineSettings, DEFAULT_SCORE_THRESHOLD};
pub use render::Renderer;
pub use summary::{build_summary, format_detection, SummaryScope};
