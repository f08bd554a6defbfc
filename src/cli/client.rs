// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Args;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};

use crate::api::{DetectionRequest, DetectionResult};
use crate::vision::image_utils::{encode_jpeg_base64, DEFAULT_JPEG_QUALITY};

/// Arguments for the client command
#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Detection endpoint URL
    #[arg(long, env = "DETECT_ENDPOINT", default_value = "http://0.0.0.0:8000/detect")]
    pub endpoint: String,

    /// Image to upload
    #[arg(long)]
    pub image: PathBuf,

    /// Text groups: one group per line, labels separated by commas
    #[arg(long)]
    pub texts: String,

    /// Where to write the annotated JPEG returned by the server
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Parse free-form query text into text groups
///
/// Each non-blank line is one group; labels within a line are separated by
/// commas and trimmed.
pub fn parse_text_queries(input: &str) -> Vec<Vec<String>> {
    input
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            line.split(',')
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(String::from)
                .collect()
        })
        .collect()
}

/// Load an image from disk and re-encode it as base64 JPEG
pub fn load_image_as_jpeg_base64(path: &Path) -> Result<String> {
    let image = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    encode_jpeg_base64(&image, DEFAULT_JPEG_QUALITY)
        .with_context(|| format!("Failed to encode {} as JPEG", path.display()))
}

pub async fn write_base64_image(data: &str, path: &Path) -> Result<()> {
    let bytes = STANDARD
        .decode(data)
        .context("Server returned an invalid base64 image")?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Post one detection request and print the result
pub async fn run_client(args: ClientArgs) -> Result<()> {
    let texts = parse_text_queries(&args.texts);
    if texts.is_empty() {
        return Err(anyhow!("Please provide at least one text query"));
    }

    let request = DetectionRequest {
        image_data: load_image_as_jpeg_base64(&args.image)?,
        texts,
    };

    let client = reqwest::Client::new();
    let response = client
        .post(&args.endpoint)
        .json(&request)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", args.endpoint))?;

    let status = response.status();
    if status != StatusCode::OK {
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }));
        eprintln!("❌ Failed to detect objects: {}", status.as_u16());
        eprintln!("{}", serde_json::to_string_pretty(&body)?);
        return Err(anyhow!("Detection request failed with status {}", status));
    }

    let result: DetectionResult = response
        .json()
        .await
        .context("Failed to parse detection response")?;

    for detection in &result.detections {
        println!("{}", detection);
    }

    if let Some(path) = args.output {
        write_base64_image(&result.image_with_boxes, &path).await?;
        println!("✅ Annotated image written to {}", path.display());
    }

    Ok(())
}
