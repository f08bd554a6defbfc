// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection request types

use serde::{Deserialize, Serialize};

/// Request for object detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionRequest {
    /// Base64-encoded JPEG or PNG
    pub image_data: String,

    /// Text groups; each inner list is one set of candidate labels
    pub texts: Vec<Vec<String>>,
}

impl DetectionRequest {
    /// Total number of text queries across all groups
    pub fn query_count(&self) -> usize {
        self.texts.iter().map(Vec::len).sum()
    }
}
