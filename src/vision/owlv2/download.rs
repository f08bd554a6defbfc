// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fetch OWLv2 ONNX weights and tokenizer from the Hugging Face Hub

use anyhow::{Context, Result};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use std::path::{Path, PathBuf};
use tracing::info;

/// Hub repository with an ONNX export of owlv2-base-patch16-ensemble
pub const DEFAULT_MODEL_REPO: &str = "onnx-community/owlv2-base-patch16-ensemble";

/// Files copied into the model directory: (path in repo, local name)
pub const MODEL_FILES: &[(&str, &str)] = &[
    ("onnx/model.onnx", "model.onnx"),
    ("tokenizer.json", "tokenizer.json"),
];

/// Download the model into `target_dir`, returning the copied file paths
///
/// Files already present in `target_dir` are left alone.
pub fn download_model(repo_id: &str, revision: Option<&str>, target_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(target_dir)
        .with_context(|| format!("Failed to create {}", target_dir.display()))?;

    let local_paths: Vec<PathBuf> = MODEL_FILES.iter().map(|(_, local)| target_dir.join(local)).collect();
    if local_paths.iter().all(|p| p.exists()) {
        info!("OWLv2 files already present in {}", target_dir.display());
        return Ok(local_paths);
    }

    let api = Api::new().context("Failed to initialise Hugging Face Hub client")?;
    let repo = match revision {
        Some(rev) => api.repo(Repo::with_revision(
            repo_id.to_string(),
            RepoType::Model,
            rev.to_string(),
        )),
        None => api.model(repo_id.to_string()),
    };

    for ((remote, _), dest) in MODEL_FILES.iter().zip(local_paths.iter()) {
        if dest.exists() {
            info!("{} already present, skipping", dest.display());
            continue;
        }

        info!("Downloading {}/{}", repo_id, remote);
        let cached = repo
            .get(remote)
            .with_context(|| format!("Failed to download {} from {}", remote, repo_id))?;
        std::fs::copy(&cached, dest)
            .with_context(|| format!("Failed to copy {} to {}", cached.display(), dest.display()))?;
    }

    Ok(local_paths)
}
