// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Burns detection boxes and labels into a copy of the request image

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use rand::seq::SliceRandom;
use rand::Rng;

use super::detector::{Detection, GroupDetections};

/// Box colours; the pick carries no meaning beyond telling boxes apart
pub const COLOR_BANK: [&str; 10] = [
    "#0AC2FF", "#47FF0A", "#FF0AC2", "#ADD8E6", "#FF0A47", "#C2FF0A", "#87CEFA", "#778899",
    "#6A5ACD", "#FF69B4",
];

const LABEL_FONT_SIZE: f32 = 12.0;
const LABEL_OFFSET_Y: i32 = 10;
const BOX_LINE_WIDTH: i32 = 2;

static FONT_BYTES: &[u8] = include_bytes!("../../assets/font.ttf");

/// Parse `#RRGGBB` into an RGB pixel
pub fn parse_hex_color(hex: &str) -> Option<Rgb<u8>> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Text drawn next to a box: `"<label>: <score:.2>"`
pub fn label_text(label: &str, score: f32) -> String {
    format!("{}: {:.2}", label, score)
}

/// Nested one-pixel rectangles making up a box outline
///
/// Corners are inclusive. Boxes too small for the full line width get fewer
/// rectangles, or none when empty.
pub fn outline_rects(detection: &Detection) -> Vec<Rect> {
    let x0 = detection.bbox.x_min.round() as i32;
    let y0 = detection.bbox.y_min.round() as i32;
    let x1 = detection.bbox.x_max.round() as i32;
    let y1 = detection.bbox.y_max.round() as i32;

    (0..BOX_LINE_WIDTH)
        .map_while(|inset| {
            let w = x1 - x0 + 1 - 2 * inset;
            let h = y1 - y0 + 1 - 2 * inset;
            (w > 0 && h > 0).then(|| Rect::at(x0 + inset, y0 + inset).of_size(w as u32, h as u32))
        })
        .collect()
}

/// Box renderer holding the embedded label font and the parsed palette
pub struct Renderer {
    font: FontRef<'static>,
    palette: Vec<Rgb<u8>>,
    scale: PxScale,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("palette", &self.palette.len())
            .field("scale", &self.scale.y)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new() -> anyhow::Result<Self> {
        let font = FontRef::try_from_slice(FONT_BYTES)
            .map_err(|e| anyhow::anyhow!("Failed to load embedded label font: {}", e))?;

        let palette = COLOR_BANK.iter().filter_map(|c| parse_hex_color(c)).collect();

        Ok(Self {
            font,
            palette,
            scale: PxScale::from(LABEL_FONT_SIZE),
        })
    }

    /// Draw every group's detections onto one composite copy of `image`
    ///
    /// `text_groups[i]` names the labels of `results[i]`. The caller's image is
    /// left untouched.
    pub fn render<R: Rng + ?Sized>(
        &self,
        image: &DynamicImage,
        text_groups: &[Vec<String>],
        results: &[GroupDetections],
        rng: &mut R,
    ) -> DynamicImage {
        let mut canvas = image.to_rgb8();

        for (labels, detections) in text_groups.iter().zip(results.iter()) {
            for detection in detections {
                let color = self
                    .palette
                    .choose(rng)
                    .copied()
                    .unwrap_or(Rgb([255, 0, 0]));
                let label = labels
                    .get(detection.label)
                    .map(String::as_str)
                    .unwrap_or("unknown");
                self.draw_detection(&mut canvas, detection, label, color);
            }
        }

        DynamicImage::ImageRgb8(canvas)
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection, label: &str, color: Rgb<u8>) {
        for rect in outline_rects(detection) {
            draw_hollow_rect_mut(canvas, rect, color);
        }

        draw_text_mut(
            canvas,
            color,
            detection.bbox.x_min.round() as i32,
            detection.bbox.y_min.round() as i32 - LABEL_OFFSET_Y,
            self.scale,
            &self.font,
            &label_text(label, detection.score),
        );
    }
}
