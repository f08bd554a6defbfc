// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for the API tests

use axum::{body::Body, http::Request, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fabstir_detect_node::{
    api::{create_app, AppState},
    config::DetectConfig,
    vision::{
        BoundingBox, DetectError, Detection, DetectionPipeline, Detector, GroupDetections,
        PipelineSettings,
    },
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Detector returning canned results, one set per requested group
pub struct FakeDetector {
    pub per_group: Vec<GroupDetections>,
    pub fail_with: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeDetector {
    pub fn new(per_group: Vec<GroupDetections>) -> Self {
        Self {
            per_group,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            per_group: Vec::new(),
            fail_with: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for FakeDetector {
    fn name(&self) -> String {
        "fake-owlv2".to_string()
    }

    fn detect(
        &self,
        _image: &DynamicImage,
        text_groups: &[Vec<String>],
        _score_threshold: f32,
    ) -> Result<Vec<GroupDetections>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(ref message) = self.fail_with {
            return Err(DetectError::Inference(message.clone()));
        }
        Ok((0..text_groups.len())
            .map(|i| self.per_group.get(i).cloned().unwrap_or_default())
            .collect())
    }
}

pub fn detection(label: usize, score: f32, bbox: [f32; 4]) -> Detection {
    Detection {
        bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
        score,
        label,
    }
}

pub fn encoded_image(width: u32, height: u32, format: ImageFormat) -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 120, 150])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    STANDARD.encode(buf.into_inner())
}

/// PNG of pseudo-random pixels; barely compresses, so the payload stays large
pub fn noisy_png(width: u32, height: u32) -> String {
    let mut state: u32 = 0x2545_f491;
    let img = RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        };
        Rgb([next(), next(), next()])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    STANDARD.encode(buf.into_inner())
}

pub fn app_with(detector: Arc<FakeDetector>) -> Router {
    app_with_settings(detector, PipelineSettings::default())
}

pub fn app_with_settings(detector: Arc<FakeDetector>, settings: PipelineSettings) -> Router {
    let pipeline = DetectionPipeline::new(detector, settings).unwrap();
    let origins = DetectConfig::default().cors_header_values().unwrap();
    create_app(AppState::new(pipeline), origins)
}

pub fn detect_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
