// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection response types

use serde::{Deserialize, Serialize};

use crate::vision::PipelineOutput;

/// Response from object detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// One formatted line per reported detection
    pub detections: Vec<String>,
    /// Base64 JPEG with boxes drawn in
    pub image_with_boxes: String,
}

impl From<PipelineOutput> for DetectionResult {
    fn from(output: PipelineOutput) -> Self {
        Self {
            detections: output.detections,
            image_with_boxes: output.image_base64,
        }
    }
}
