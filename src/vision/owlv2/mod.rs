// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OWLv2 open-vocabulary object detection
//!
//! Components:
//! - `model` - ONNX session, tokenizer and the [`Detector`](crate::vision::Detector) impl
//! - `preprocessing` - pad-to-square, resize and CLIP normalization
//! - `postprocessing` - per-group scoring, box conversion and optional NMS
//! - `download` - fetch weights from the Hugging Face Hub

pub mod download;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;

pub use download::{download_model, DEFAULT_MODEL_REPO};
pub use model::{Owlv2Model, Owlv2Options, MAX_TEXT_TOKENS};
pub use postprocessing::{post_process, PostProcessParams};
pub use preprocessing::{preprocess_for_owlv2, OWLV2_INPUT_SIZE};
