// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /detect tests
//!
//! These tests verify that:
//! - Valid JPEG/PNG requests return detections and an annotated JPEG
//! - Only the last group is summarised by default
//! - The detector runs once per request regardless of group count
//! - Every failure is a 500 with the flat error body

use axum::http::{Method, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use fabstir_detect_node::vision::{PipelineSettings, SummaryScope};
use image::ImageFormat;
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use super::support::*;

fn two_group_detector() -> Arc<FakeDetector> {
    Arc::new(FakeDetector::new(vec![
        vec![
            detection(0, 0.91, [4.0, 4.0, 30.0, 30.0]),
            detection(1, 0.42, [10.0, 12.0, 50.0, 40.0]),
        ],
        vec![detection(0, 0.27, [20.0, 5.0, 60.0, 35.0])],
    ]))
}

#[tokio::test]
async fn test_detect_png_returns_last_group_summary() {
    let detector = two_group_detector();
    let app = app_with(detector.clone());

    let response = app
        .oneshot(detect_request(json!({
            "image_data": encoded_image(64, 48, ImageFormat::Png),
            "texts": [["cat", "dog"], ["remote control"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let detections = body["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(
        detections[0],
        "Detected remote control with confidence 0.270 at location [20.00, 5.00, 60.00, 35.00]"
    );
    assert_eq!(detector.calls(), 1);
}

#[tokio::test]
async fn test_detect_returns_jpeg_with_input_dimensions() {
    let app = app_with(two_group_detector());

    let response = app
        .oneshot(detect_request(json!({
            "image_data": encoded_image(64, 48, ImageFormat::Jpeg),
            "texts": [["cat", "dog"], ["remote control"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let bytes = STANDARD
        .decode(body["image_with_boxes"].as_str().unwrap())
        .unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
    let annotated = image::load_from_memory(&bytes).unwrap();
    assert_eq!((annotated.width(), annotated.height()), (64, 48));
}

#[tokio::test]
async fn test_detect_all_groups_scope() {
    let settings = PipelineSettings {
        summary_scope: SummaryScope::AllGroups,
        ..PipelineSettings::default()
    };
    let app = app_with_settings(two_group_detector(), settings);

    let response = app
        .oneshot(detect_request(json!({
            "image_data": encoded_image(64, 48, ImageFormat::Png),
            "texts": [["cat", "dog"], ["remote control"]]
        })))
        .await
        .unwrap();

    let body = body_json(response).await;
    let detections = body["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 3);
    assert!(detections[1].as_str().unwrap().starts_with("Detected dog with confidence 0.420"));
}

#[tokio::test]
async fn test_detect_no_matches_still_returns_image() {
    let detector = Arc::new(FakeDetector::new(vec![]));
    let app = app_with(detector.clone());

    let response = app
        .oneshot(detect_request(json!({
            "image_data": encoded_image(32, 32, ImageFormat::Png),
            "texts": [["unicorn"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["detections"].as_array().unwrap().is_empty());
    assert!(!body["image_with_boxes"].as_str().unwrap().is_empty());
    assert_eq!(detector.calls(), 1);
}

#[tokio::test]
async fn test_detect_empty_texts_skips_inference() {
    let detector = two_group_detector();
    let app = app_with(detector.clone());

    let response = app
        .oneshot(detect_request(json!({
            "image_data": encoded_image(32, 16, ImageFormat::Png),
            "texts": []
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["detections"].as_array().unwrap().is_empty());

    let bytes = STANDARD
        .decode(body["image_with_boxes"].as_str().unwrap())
        .unwrap();
    let annotated = image::load_from_memory(&bytes).unwrap();
    assert_eq!((annotated.width(), annotated.height()), (32, 16));
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_detect_malformed_base64_is_500() {
    let detector = two_group_detector();
    let app = app_with(detector.clone());

    let response = app
        .oneshot(detect_request(json!({
            "image_data": "this is not base64!!",
            "texts": [["cat"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Internal server error");
    assert!(body["details"].as_str().unwrap().contains("base64"));
    assert!(body.get("image_with_boxes").is_none());
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_detect_unsupported_format_is_500() {
    let app = app_with(two_group_detector());

    let response = app
        .oneshot(detect_request(json!({
            // 1x1 GIF
            "image_data": "R0lGODlhAQABAIAAAP///wAAACH5BAEAAAAALAAAAAABAAEAAAICRAEAOw==",
            "texts": [["cat"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains("Unsupported image format"));
}

#[tokio::test]
async fn test_detect_inference_failure_is_500() {
    let detector = Arc::new(FakeDetector::failing("session exploded"));
    let app = app_with(detector.clone());

    let response = app
        .oneshot(detect_request(json!({
            "image_data": encoded_image(16, 16, ImageFormat::Png),
            "texts": [["cat"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(body["details"], "Inference failed: session exploded");
    assert_eq!(detector.calls(), 1);
}

#[tokio::test]
async fn test_detect_invalid_json_rejected_before_handler() {
    let detector = two_group_detector();
    let app = app_with(detector.clone());

    let response = app
        .oneshot(detect_request(json!({ "image_data": "abc", "texts": "cat" })))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_detect_rejects_get() {
    let app = app_with(two_group_detector());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/detect")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_detect_accepts_multi_megabyte_image() {
    let detector = two_group_detector();
    let app = app_with(detector.clone());

    let image_data = noisy_png(1000, 1000);
    assert!(image_data.len() > 3 * 1024 * 1024);

    let response = app
        .oneshot(detect_request(json!({
            "image_data": image_data,
            "texts": [["cat", "dog"], ["remote control"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let bytes = STANDARD
        .decode(body["image_with_boxes"].as_str().unwrap())
        .unwrap();
    let annotated = image::load_from_memory(&bytes).unwrap();
    assert_eq!((annotated.width(), annotated.height()), (1000, 1000));
    assert_eq!(detector.calls(), 1);
}

#[tokio::test]
async fn test_detect_image_over_configured_limit_is_500() {
    let settings = PipelineSettings {
        max_image_bytes: 4 * 1024,
        ..PipelineSettings::default()
    };
    let detector = two_group_detector();
    let app = app_with_settings(detector.clone(), settings);

    let response = app
        .oneshot(detect_request(json!({
            "image_data": noisy_png(64, 64),
            "texts": [["cat"]]
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Internal server error");
    assert!(body["details"].as_str().unwrap().contains("too large"));
    assert_eq!(detector.calls(), 0);
}
