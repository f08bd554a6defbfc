// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pipeline tests with a scripted detector
//!
//! Exercise decode, render, summarise and encode together without model
//! weights.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use fabstir_detect_node::vision::{
    BoundingBox, DetectError, Detection, DetectionPipeline, Detector, GroupDetections,
    PipelineSettings,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

struct ScriptedDetector(Vec<GroupDetections>);

impl Detector for ScriptedDetector {
    fn name(&self) -> String {
        "scripted".to_string()
    }

    fn detect(
        &self,
        _image: &DynamicImage,
        text_groups: &[Vec<String>],
        _score_threshold: f32,
    ) -> Result<Vec<GroupDetections>, DetectError> {
        Ok(self.0.iter().take(text_groups.len()).cloned().collect())
    }
}

fn white_png(width: u32, height: u32) -> String {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    STANDARD.encode(buf.into_inner())
}

fn decode_output(image_base64: &str) -> RgbImage {
    let bytes = STANDARD.decode(image_base64).unwrap();
    image::load_from_memory(&bytes).unwrap().to_rgb8()
}

fn is_white(p: &Rgb<u8>) -> bool {
    p.0.iter().all(|&c| c > 235)
}

#[test]
fn test_boxes_from_every_group_are_drawn() {
    let results = vec![
        vec![Detection {
            bbox: BoundingBox::new(10.0, 30.0, 60.0, 90.0),
            score: 0.8,
            label: 0,
        }],
        vec![Detection {
            bbox: BoundingBox::new(100.0, 40.0, 150.0, 100.0),
            score: 0.6,
            label: 0,
        }],
    ];
    let pipeline = DetectionPipeline::new(
        Arc::new(ScriptedDetector(results)),
        PipelineSettings {
            jpeg_quality: 95,
            ..PipelineSettings::default()
        },
    )
    .unwrap();

    let groups = vec![vec!["cat".to_string()], vec!["dog".to_string()]];
    let output = pipeline.run(&white_png(160, 120), &groups).unwrap();

    // Only the last group is summarised, but both are rendered
    assert_eq!(output.detections.len(), 1);
    assert!(output.detections[0].starts_with("Detected dog"));

    let annotated = decode_output(&output.image_base64);
    assert_eq!(annotated.dimensions(), (160, 120));

    // Left edges of both boxes are painted; interiors stay white
    assert!(!is_white(annotated.get_pixel(10, 60)));
    assert!(!is_white(annotated.get_pixel(100, 70)));
    assert!(is_white(annotated.get_pixel(35, 60)));
    assert!(is_white(annotated.get_pixel(125, 70)));
}

#[test]
fn test_pipeline_jpeg_input() {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb([10, 200, 10])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    let jpeg = STANDARD.encode(buf.into_inner());

    let pipeline = DetectionPipeline::new(
        Arc::new(ScriptedDetector(vec![vec![]])),
        PipelineSettings::default(),
    )
    .unwrap();

    let output = pipeline.run(&jpeg, &[vec!["plant".to_string()]]).unwrap();
    assert!(output.detections.is_empty());
    assert_eq!(decode_output(&output.image_base64).dimensions(), (40, 30));
}

#[test]
fn test_image_limit_enforced() {
    let pipeline = DetectionPipeline::new(
        Arc::new(ScriptedDetector(vec![])),
        PipelineSettings {
            max_image_bytes: 16,
            ..PipelineSettings::default()
        },
    )
    .unwrap();

    let err = pipeline
        .run(&white_png(64, 64), &[vec!["cat".to_string()]])
        .unwrap_err();
    assert!(err.to_string().contains("too large"));
}
