// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turns raw OWLv2 outputs into per-group detections
//!
//! All queries of all groups go through the model in one batch. Each group is
//! then scored against its own slice of the query axis, so label indices stay
//! local to the group.

use ndarray::{ArrayView2, Axis};
use std::ops::Range;

use crate::vision::detector::{non_max_suppression, BoundingBox, Detection, GroupDetections};

/// Post-processing settings for one request
#[derive(Debug, Clone, Copy)]
pub struct PostProcessParams {
    /// Minimum sigmoid score to keep a patch
    pub score_threshold: f32,
    /// IoU above which lower-scored boxes are suppressed; `None` keeps all
    pub nms_iou_threshold: Option<f32>,
    /// Original image width in pixels
    pub image_width: u32,
    /// Original image height in pixels
    pub image_height: u32,
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Query ranges of each group in the flattened query axis
pub fn group_ranges(text_groups: &[Vec<String>]) -> Vec<Range<usize>> {
    let mut start = 0;
    text_groups
        .iter()
        .map(|group| {
            let range = start..start + group.len();
            start += group.len();
            range
        })
        .collect()
}

/// Convert a `(cx, cy, w, h)` box normalized to the padded square into
/// absolute pixel corners of the original image
pub fn center_to_corners(cxcywh: [f32; 4], image_width: u32, image_height: u32) -> BoundingBox {
    let side = image_width.max(image_height) as f32;
    let [cx, cy, w, h] = cxcywh;

    BoundingBox::new(
        (cx - 0.5 * w) * side,
        (cy - 0.5 * h) * side,
        (cx + 0.5 * w) * side,
        (cy + 0.5 * h) * side,
    )
    .clamp_to(image_width, image_height)
}

/// Build detections for every group
///
/// - `logits`: `[patches, queries]`
/// - `boxes`: `[patches, 4]` in normalized `(cx, cy, w, h)`
pub fn post_process(
    logits: ArrayView2<'_, f32>,
    boxes: ArrayView2<'_, f32>,
    ranges: &[Range<usize>],
    params: &PostProcessParams,
) -> Vec<GroupDetections> {
    let num_queries = logits.len_of(Axis(1));

    ranges
        .iter()
        .map(|range| {
            if range.is_empty() || range.end > num_queries {
                return Vec::new();
            }

            let mut detections: Vec<Detection> = logits
                .outer_iter()
                .zip(boxes.outer_iter())
                .filter_map(|(patch_logits, patch_box)| {
                    let (label, best) = patch_logits
                        .slice(ndarray::s![range.start..range.end])
                        .iter()
                        .copied()
                        .enumerate()
                        .filter(|(_, logit)| logit.is_finite())
                        .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

                    let score = sigmoid(best);
                    // strictly above the threshold
                    if !score.is_finite() || score <= params.score_threshold {
                        return None;
                    }

                    let bbox = center_to_corners(
                        [patch_box[0], patch_box[1], patch_box[2], patch_box[3]],
                        params.image_width,
                        params.image_height,
                    );
                    Some(Detection { bbox, score, label })
                })
                .collect();

            if let Some(iou) = params.nms_iou_threshold {
                detections = non_max_suppression(detections, iou);
            }
            detections
        })
        .collect()
}
