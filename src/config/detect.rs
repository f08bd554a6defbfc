// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration for the detection node

use axum::http::HeaderValue;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use thiserror::Error;

use crate::vision::image_utils::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_IMAGE_BYTES};
use crate::vision::owlv2::Owlv2Options;
use crate::vision::pipeline::{PipelineSettings, DEFAULT_SCORE_THRESHOLD};
use crate::vision::summary::SummaryScope;

/// Origins of the bundled UI and local development servers
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://localhost:8000",
    "http://localhost:8501",
];

pub const DEFAULT_MODEL_DIR: &str = "./models/owlv2-base-patch16-ensemble-onnx";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Detection threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("NMS IoU threshold must be within (0, 1], got {0}")]
    InvalidNmsThreshold(f32),

    #[error("JPEG quality must be within 1..=100, got {0}")]
    InvalidJpegQuality(u8),

    #[error("Maximum image size must be greater than 0")]
    ZeroImageLimit,

    #[error("ONNX Runtime intra threads must be greater than 0")]
    ZeroThreads,

    #[error("No valid CORS origin configured")]
    NoCorsOrigins,

    #[error("Invalid CORS origin '{0}'")]
    InvalidCorsOrigin(String),

    #[error("Invalid listen address {0}")]
    InvalidAddress(String),
}

/// Configuration for the detection node
#[derive(Debug, Clone)]
pub struct DetectConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Directory holding `model.onnx` and `tokenizer.json`
    pub model_dir: PathBuf,
    pub score_threshold: f32,
    /// Per-group NMS; disabled when `None`
    pub nms_iou_threshold: Option<f32>,
    pub summary_scope: SummaryScope,
    pub jpeg_quality: u8,
    /// Upper bound on the decoded request payload
    pub max_image_bytes: usize,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            nms_iou_threshold: None,
            summary_scope: SummaryScope::LastGroup,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            intra_threads: 4,
        }
    }
}

impl DetectConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::InvalidThreshold(self.score_threshold));
        }
        if let Some(iou) = self.nms_iou_threshold {
            if !(iou > 0.0 && iou <= 1.0) {
                return Err(ConfigError::InvalidNmsThreshold(iou));
            }
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidJpegQuality(self.jpeg_quality));
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::ZeroImageLimit);
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        self.cors_header_values()?;
        self.bind_addr()?;
        Ok(())
    }

    /// Socket address to listen on
    ///
    /// `host` may be an IP literal or a hostname such as `localhost`; the
    /// first resolved address is used.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = || ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port));
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| invalid())?
            .next()
            .ok_or_else(invalid)
    }

    /// CORS origins as header values, rejecting any that cannot be sent
    pub fn cors_header_values(&self) -> Result<Vec<HeaderValue>, ConfigError> {
        if self.cors_origins.is_empty() {
            return Err(ConfigError::NoCorsOrigins);
        }
        self.cors_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::InvalidCorsOrigin(origin.clone()))
            })
            .collect()
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            score_threshold: self.score_threshold,
            summary_scope: self.summary_scope,
            jpeg_quality: self.jpeg_quality,
            max_image_bytes: self.max_image_bytes,
        }
    }

    pub fn owlv2_options(&self) -> Owlv2Options {
        Owlv2Options {
            intra_threads: self.intra_threads,
            nms_iou_threshold: self.nms_iou_threshold,
        }
    }
}

/// Split a comma-separated origin list, dropping blanks
pub fn parse_cors_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
