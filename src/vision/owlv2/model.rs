// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OWLv2 ONNX model wrapper
//!
//! A single ONNX session runs the text tower, the vision tower and the box
//! head together. Inputs are `input_ids`/`attention_mask` for every text
//! query and one `pixel_values` image; outputs are `logits`
//! `[1, patches, queries]` and `pred_boxes` `[1, patches, 4]`.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{Array2, Axis, Ix2};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info, warn};

use super::postprocessing::{group_ranges, post_process, PostProcessParams};
use super::preprocessing::{preprocess_for_owlv2, OWLV2_INPUT_SIZE};
use crate::vision::detector::{DetectError, Detector, GroupDetections};

/// CLIP text context used by OWLv2 queries
pub const MAX_TEXT_TOKENS: usize = 16;

/// Candidate file names for the exported graph, in lookup order
const MODEL_FILE_NAMES: &[&str] = &["model.onnx", "onnx/model.onnx", "owlv2.onnx"];

const TOKENIZER_FILE_NAME: &str = "tokenizer.json";

/// Load-time options
#[derive(Debug, Clone)]
pub struct Owlv2Options {
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
    /// Per-group NMS; `None` keeps every box above threshold
    pub nms_iou_threshold: Option<f32>,
}

impl Default for Owlv2Options {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            nms_iou_threshold: None,
        }
    }
}

/// OWLv2 open-vocabulary detector backed by ONNX Runtime
///
/// # Thread Safety
/// The session sits behind a `Mutex`; concurrent requests serialise on
/// inference while everything else runs in parallel.
#[derive(Clone)]
pub struct Owlv2Model {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    model_dir: PathBuf,
    logits_output: String,
    boxes_output: String,
    options: Owlv2Options,
}

impl std::fmt::Debug for Owlv2Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owlv2Model")
            .field("model_dir", &self.model_dir)
            .field("logits_output", &self.logits_output)
            .field("boxes_output", &self.boxes_output)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Owlv2Model {
    /// Load OWLv2 from a model directory
    ///
    /// Expected files:
    /// - `model.onnx` (or `onnx/model.onnx`)
    /// - `tokenizer.json`
    ///
    /// # Errors
    /// Returns error if:
    /// - Model directory or files are missing
    /// - Tokenizer cannot be parsed
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(model_dir: P, options: Owlv2Options) -> Result<Self> {
        let model_dir = model_dir.as_ref();

        if !model_dir.exists() {
            anyhow::bail!("OWLv2 model directory not found: {}", model_dir.display());
        }

        info!("Loading OWLv2 from {}", model_dir.display());

        let model_path = find_model_file(model_dir, MODEL_FILE_NAMES)?;
        let tokenizer_path = model_dir.join(TOKENIZER_FILE_NAME);
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let session = build_session(&model_path, options.intra_threads)?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        debug!("OWLv2 outputs: {:?}", output_names);

        let logits_output = resolve_output(&output_names, "logits", 0)?;
        let boxes_output = resolve_output(&output_names, "pred_boxes", 1)?;

        let tokenizer = load_tokenizer(&tokenizer_path)?;

        info!(
            "✅ OWLv2 loaded (outputs: {}, {}; nms: {:?})",
            logits_output, boxes_output, options.nms_iou_threshold
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            model_dir: model_dir.to_path_buf(),
            logits_output,
            boxes_output,
            options,
        })
    }

    /// Tokenize every query into fixed-width `input_ids` and `attention_mask`
    fn tokenize(&self, queries: &[&str]) -> Result<(Array2<i64>, Array2<i64>), DetectError> {
        let encodings = self
            .tokenizer
            .encode_batch(queries.to_vec(), true)
            .map_err(|e| DetectError::Inference(format!("Tokenization failed: {}", e)))?;

        let mut ids = Vec::with_capacity(queries.len() * MAX_TEXT_TOKENS);
        let mut mask = Vec::with_capacity(queries.len() * MAX_TEXT_TOKENS);

        for encoding in &encodings {
            if encoding.get_ids().len() != MAX_TEXT_TOKENS {
                return Err(DetectError::Inference(format!(
                    "Tokenizer produced {} tokens, expected {}",
                    encoding.get_ids().len(),
                    MAX_TEXT_TOKENS
                )));
            }
            ids.extend(encoding.get_ids().iter().map(|&id| id as i64));
            mask.extend(encoding.get_attention_mask().iter().map(|&m| m as i64));
        }

        let shape = (queries.len(), MAX_TEXT_TOKENS);
        let input_ids = Array2::from_shape_vec(shape, ids).map_err(inference_error)?;
        let attention_mask = Array2::from_shape_vec(shape, mask).map_err(inference_error)?;
        Ok((input_ids, attention_mask))
    }
}

impl Detector for Owlv2Model {
    fn name(&self) -> String {
        "owlv2-base-patch16-ensemble".to_string()
    }

    fn detect(
        &self,
        image: &DynamicImage,
        text_groups: &[Vec<String>],
        score_threshold: f32,
    ) -> Result<Vec<GroupDetections>, DetectError> {
        let queries: Vec<&str> = text_groups.iter().flatten().map(String::as_str).collect();
        if queries.is_empty() {
            return Ok(vec![Vec::new(); text_groups.len()]);
        }

        let (input_ids, attention_mask) = self.tokenize(&queries)?;
        let pixel_values = preprocess_for_owlv2(image, OWLV2_INPUT_SIZE);

        let params = PostProcessParams {
            score_threshold,
            nms_iou_threshold: self.options.nms_iou_threshold,
            image_width: image.width(),
            image_height: image.height(),
        };
        let ranges = group_ranges(text_groups);

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectError::Inference("OWLv2 session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => Value::from_array(input_ids).map_err(inference_error)?,
                "pixel_values" => Value::from_array(pixel_values).map_err(inference_error)?,
                "attention_mask" => Value::from_array(attention_mask).map_err(inference_error)?
            ])
            .map_err(inference_error)?;

        let logits = outputs[self.logits_output.as_str()]
            .try_extract_array::<f32>()
            .map_err(inference_error)?;
        let boxes = outputs[self.boxes_output.as_str()]
            .try_extract_array::<f32>()
            .map_err(inference_error)?;

        debug!(
            "OWLv2 output shapes: logits {:?}, boxes {:?}",
            logits.shape(),
            boxes.shape()
        );

        if logits.ndim() != 3 || boxes.ndim() != 3 {
            return Err(DetectError::Inference(format!(
                "Unexpected output rank: logits {:?}, boxes {:?}",
                logits.shape(),
                boxes.shape()
            )));
        }

        let logits = logits
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(inference_error)?;
        let boxes = boxes
            .index_axis(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .map_err(inference_error)?;

        Ok(post_process(logits, boxes, &ranges, &params))
    }
}

fn inference_error<E: std::fmt::Display>(e: E) -> DetectError {
    DetectError::Inference(e.to_string())
}

/// Find the first existing model file among candidate names
fn find_model_file(dir: &Path, names: &[&str]) -> Result<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No OWLv2 model file in {} (tried: {})",
                dir.display(),
                names.join(", ")
            )
        })
}

/// Pick an output by name, falling back to its position
fn resolve_output(names: &[String], wanted: &str, position: usize) -> Result<String> {
    if let Some(name) = names.iter().find(|n| n.as_str() == wanted) {
        return Ok(name.clone());
    }
    names
        .get(position)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Model has no '{}' output (outputs: {:?})", wanted, names))
}

/// Build the ONNX session, CUDA first with CPU fallback
fn build_session(model_path: &Path, intra_threads: usize) -> Result<Session> {
    let cuda_result = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default().build()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path);

    match cuda_result {
        Ok(session) => Ok(session),
        Err(e) => {
            warn!("⚠️  CUDA execution provider failed: {}", e);
            warn!("   Falling back to CPU execution provider");
            Session::builder()
                .context("Failed to create session builder")?
                .with_execution_providers([CPUExecutionProvider::default().build()])
                .context("Failed to set CPU execution provider")?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .context("Failed to set optimization level")?
                .with_intra_threads(intra_threads)
                .context("Failed to set intra threads")?
                .commit_from_file(model_path)
                .context(format!(
                    "Failed to load OWLv2 model from {}",
                    model_path.display()
                ))
        }
    }
}

/// Load the CLIP tokenizer with OWLv2's fixed padding and truncation
fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    let mut tokenizer = Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

    let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0);
    let pad_token = tokenizer
        .get_padding()
        .map(|p| p.pad_token.clone())
        .unwrap_or_else(|| "!".to_string());

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(MAX_TEXT_TOKENS),
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: MAX_TEXT_TOKENS,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("Failed to configure tokenizer truncation: {}", e))?;

    Ok(tokenizer)
}
