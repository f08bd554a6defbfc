// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::detect::DEFAULT_MODEL_DIR;
use crate::vision::owlv2::{download_model as fetch_model, DEFAULT_MODEL_REPO};

/// Arguments for the download-model command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Hugging Face repository with the ONNX export
    #[arg(long, default_value = DEFAULT_MODEL_REPO)]
    pub repo: String,

    /// Git revision (branch, tag or commit)
    #[arg(long)]
    pub revision: Option<String>,

    /// Destination directory
    #[arg(long, env = "OWL_MODEL_DIR", default_value = DEFAULT_MODEL_DIR)]
    pub model_dir: PathBuf,
}

pub async fn download_model(args: DownloadArgs) -> Result<()> {
    println!("📥 Downloading {} into {}", args.repo, args.model_dir.display());

    let files = tokio::task::spawn_blocking(move || {
        fetch_model(&args.repo, args.revision.as_deref(), &args.model_dir)
    })
    .await
    .context("Download task failed")??;

    for file in files {
        println!("  ✓ {}", file.display());
    }
    Ok(())
}
