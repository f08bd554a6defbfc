// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::args::{ModelArgs, ServeArgs};
use super::client::parse_text_queries;
use crate::api::start_server;
use crate::config::DetectConfig;
use crate::version::{get_version_string, FEATURES, VERSION};
use crate::vision::owlv2::Owlv2Model;
use crate::vision::DetectionPipeline;

/// Arguments for the offline detect command
#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Image to run detection on (JPEG or PNG)
    #[arg(long)]
    pub image: PathBuf,

    /// Text groups: one group per line, labels separated by commas
    #[arg(long)]
    pub texts: String,

    /// Where to write the annotated JPEG
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Load OWLv2 once and wrap it in a pipeline
pub async fn load_pipeline(config: &DetectConfig) -> Result<DetectionPipeline> {
    let model = Owlv2Model::new(&config.model_dir, config.owlv2_options())
        .await
        .with_context(|| format!("Failed to load OWLv2 from {}", config.model_dir.display()))?;

    DetectionPipeline::new(Arc::new(model), config.pipeline_settings())
}

/// Start the HTTP server
pub async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.to_config()?;

    info!("🚀 Starting {} [{}]", get_version_string(), VERSION);
    info!("Features: {}", FEATURES.join(", "));
    info!(
        "Model: {} | threshold: {} | nms: {:?} | summary: {}",
        config.model_dir.display(),
        config.score_threshold,
        config.nms_iou_threshold,
        config.summary_scope
    );

    let pipeline = load_pipeline(&config).await?;
    start_server(&config, pipeline).await
}

/// Run the pipeline on a local file
pub async fn detect(args: DetectArgs) -> Result<()> {
    let config = args.model.to_config()?;
    let text_groups = parse_text_queries(&args.texts);

    let image_bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    let image_base64 = STANDARD.encode(&image_bytes);

    let pipeline = load_pipeline(&config).await?;
    let output = tokio::task::spawn_blocking(move || pipeline.run(&image_base64, &text_groups))
        .await
        .context("Detection task failed")??;

    for line in &output.detections {
        println!("{}", line);
    }
    if output.detections.is_empty() {
        println!("No detections");
    }
    println!(
        "📦 {} boxes across {} groups",
        output.box_count(),
        output.groups.len()
    );

    if let Some(path) = args.output {
        super::client::write_base64_image(&output.image_base64, &path).await?;
        println!("✅ Annotated image written to {}", path.display());
    }

    Ok(())
}
