// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Args;
use std::path::PathBuf;

use crate::config::detect::DEFAULT_MODEL_DIR;
use crate::config::{parse_cors_origins, ConfigError, DetectConfig};
use crate::vision::image_utils::{DEFAULT_JPEG_QUALITY, DEFAULT_MAX_IMAGE_BYTES};
use crate::vision::pipeline::DEFAULT_SCORE_THRESHOLD;
use crate::vision::summary::SummaryScope;

/// Model and pipeline options shared by `serve` and `detect`
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Directory containing model.onnx and tokenizer.json
    #[arg(long, env = "OWL_MODEL_DIR", default_value = DEFAULT_MODEL_DIR)]
    pub model_dir: PathBuf,

    /// Minimum detection score (0.0-1.0)
    #[arg(long, env = "DETECTION_THRESHOLD", default_value_t = DEFAULT_SCORE_THRESHOLD)]
    pub threshold: f32,

    /// Enable per-group NMS with this IoU threshold
    #[arg(long, env = "NMS_IOU_THRESHOLD")]
    pub nms_iou_threshold: Option<f32>,

    /// Which groups appear in the detection list (last-group/all-groups)
    #[arg(long, env = "SUMMARY_SCOPE", default_value_t = SummaryScope::LastGroup)]
    pub summary_scope: SummaryScope,

    /// JPEG quality of the annotated image (1-100)
    #[arg(long, env = "JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY)]
    pub jpeg_quality: u8,

    /// Maximum decoded image size in bytes
    #[arg(long, env = "MAX_IMAGE_BYTES", default_value_t = DEFAULT_MAX_IMAGE_BYTES)]
    pub max_image_bytes: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,
}

impl ModelArgs {
    fn apply(&self, config: &mut DetectConfig) {
        config.model_dir = self.model_dir.clone();
        config.score_threshold = self.threshold;
        config.nms_iou_threshold = self.nms_iou_threshold;
        config.summary_scope = self.summary_scope;
        config.jpeg_quality = self.jpeg_quality;
        config.max_image_bytes = self.max_image_bytes;
        config.intra_threads = self.intra_threads;
    }

    /// Validated config for offline use; server fields keep their defaults
    pub fn to_config(&self) -> Result<DetectConfig, ConfigError> {
        let mut config = DetectConfig::default();
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Interface to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Comma-separated CORS origins (defaults to the localhost UI origins)
    #[arg(long, env = "CORS_ORIGINS")]
    pub cors_origins: Option<String>,
}

impl ServeArgs {
    pub fn to_config(&self) -> Result<DetectConfig, ConfigError> {
        let mut config = DetectConfig {
            host: self.host.clone(),
            port: self.port,
            ..DetectConfig::default()
        };
        self.model.apply(&mut config);
        if let Some(ref raw) = self.cors_origins {
            config.cors_origins = parse_cors_origins(raw);
        }
        config.validate()?;
        Ok(config)
    }
}
