// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end detection pipeline
//!
//! decode -> detect (once, all groups) -> render -> summarise -> encode

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::detector::{DetectError, Detector, GroupDetections};
use super::image_utils::{
    decode_base64_image, encode_jpeg_base64, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_IMAGE_BYTES,
};
use super::render::Renderer;
use super::summary::{build_summary, SummaryScope};

/// Default score threshold for OWLv2 detections
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;

/// Tunables applied to every request
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub score_threshold: f32,
    pub summary_scope: SummaryScope,
    pub jpeg_quality: u8,
    pub max_image_bytes: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            summary_scope: SummaryScope::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Summary strings for the selected groups
    pub detections: Vec<String>,
    /// Base64 JPEG with every group's boxes drawn in
    pub image_base64: String,
    /// Raw per-group detections, parallel to the request's text groups
    pub groups: Vec<GroupDetections>,
}

impl PipelineOutput {
    /// Boxes across all groups, summarised or not
    pub fn box_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

/// Shared detection pipeline
///
/// Cheap to clone; the detector is shared behind an `Arc`.
#[derive(Clone)]
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
    renderer: Arc<Renderer>,
    settings: PipelineSettings,
}

impl std::fmt::Debug for DetectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionPipeline")
            .field("detector", &self.detector.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl DetectionPipeline {
    pub fn new(detector: Arc<dyn Detector>, settings: PipelineSettings) -> anyhow::Result<Self> {
        Ok(Self {
            detector,
            renderer: Arc::new(Renderer::new()?),
            settings,
        })
    }

    pub fn detector_name(&self) -> String {
        self.detector.name()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one request
    ///
    /// Blocking; callers on the async runtime should use `spawn_blocking`.
    /// An empty `text_groups` skips inference and returns the re-encoded
    /// image with no detections.
    pub fn run(
        &self,
        image_base64: &str,
        text_groups: &[Vec<String>],
    ) -> Result<PipelineOutput, DetectError> {
        let start = Instant::now();

        let (image, info) = decode_base64_image(image_base64, self.settings.max_image_bytes)?;
        debug!(
            "Decoded image: {}x{} {:?}, {} bytes",
            info.width, info.height, info.format, info.size_bytes
        );

        let groups = if text_groups.is_empty() {
            Vec::new()
        } else {
            self.detector
                .detect(&image, text_groups, self.settings.score_threshold)?
        };

        if groups.len() != text_groups.len() {
            return Err(DetectError::Inference(format!(
                "Detector returned {} result sets for {} text groups",
                groups.len(),
                text_groups.len()
            )));
        }

        let annotated = self
            .renderer
            .render(&image, text_groups, &groups, &mut rand::thread_rng());

        let detections = build_summary(text_groups, &groups, self.settings.summary_scope);

        let image_base64 = encode_jpeg_base64(&annotated, self.settings.jpeg_quality)
            .map_err(|e| DetectError::Encoding(e.to_string()))?;

        let output = PipelineOutput {
            detections,
            image_base64,
            groups,
        };
        info!(
            "Detection complete: {} groups, {} boxes, {} summarised, {}ms",
            text_groups.len(),
            output.box_count(),
            output.detections.len(),
            start.elapsed().as_millis()
        );

        Ok(output)
    }
}
