// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection types and the detector seam
//!
//! Everything outside `vision::owlv2` talks to the model through [`Detector`],
//! so the HTTP layer and the pipeline can be exercised with a fake.

use image::DynamicImage;
use thiserror::Error;

use super::image_utils::ImageError;

/// Axis-aligned box in absolute pixel coordinates of the original image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Coordinates in `[left, top, right, bottom]` order
    pub fn to_array(&self) -> [f32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let iy = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Clamp the box to `[0, width] x [0, height]`
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x_min: self.x_min.clamp(0.0, w),
            y_min: self.y_min.clamp(0.0, h),
            x_max: self.x_max.clamp(0.0, w),
            y_max: self.y_max.clamp(0.0, h),
        }
    }
}

/// One detection inside a text group
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Confidence score (0.0-1.0)
    pub score: f32,
    /// Index of the matched label within its group
    pub label: usize,
}

/// Detections for one text group, in model output order
pub type GroupDetections = Vec<Detection>;

/// Errors at the adapter boundary
///
/// The HTTP layer flattens all of these into a single 500 body.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("{0}")]
    Decode(#[from] ImageError),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Failed to encode annotated image: {0}")]
    Encoding(String),
}

impl DetectError {
    /// Short machine-readable kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::Decode(_) => "decode",
            DetectError::Inference(_) => "inference",
            DetectError::Encoding(_) => "encoding",
        }
    }
}

/// Open-vocabulary detector
///
/// One call covers every text group of a request and returns one result set
/// per group, in the same order. Scores below `score_threshold` are dropped.
#[cfg_attr(test, mockall::automock)]
pub trait Detector: Send + Sync {
    /// Model name reported by `/health`
    fn name(&self) -> String;

    fn detect(
        &self,
        image: &DynamicImage,
        text_groups: &[Vec<String>],
        score_threshold: f32,
    ) -> Result<Vec<GroupDetections>, DetectError>;
}

/// Greedy non-maximum suppression, highest score first
///
/// Boxes overlapping a kept box by more than `iou_threshold` are dropped.
/// The returned detections are sorted by descending score.
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        if kept.iter().all(|k| k.bbox.iou(&det.bbox) <= iou_threshold) {
            kept.push(det);
        }
    }
    kept
}
