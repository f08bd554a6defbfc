// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for OWLv2

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input resolution of owlv2-base-patch16
pub const OWLV2_INPUT_SIZE: u32 = 960;

/// CLIP normalization mean values
pub const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std values
pub const STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Grey used for the padded area (0.5 after rescaling to [0, 1])
const PAD_VALUE: u8 = 128;

/// Pad an image bottom/right to a square with grey
///
/// The top-left corner stays at the origin, so normalized box coordinates
/// predicted on the square map back to the original by the square side.
pub fn pad_to_square(image: &DynamicImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let side = w.max(h).max(1);

    let mut square = RgbImage::from_pixel(side, side, Rgb([PAD_VALUE; 3]));
    image::imageops::replace(&mut square, &image.to_rgb8(), 0, 0);
    square
}

/// Preprocess an image for the OWLv2 vision tower
///
/// Steps:
/// 1. Pad bottom/right to a square
/// 2. Resize to `size` x `size`
/// 3. Normalize with CLIP mean/std: (pixel/255 - mean) / std
/// 4. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_owlv2(image: &DynamicImage, size: u32) -> Array4<f32> {
    let square = pad_to_square(image);
    let resized = image::imageops::resize(&square, size, size, FilterType::Triangle);

    let size = size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let normalized = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
            tensor[[0, c, y as usize, x as usize]] = normalized;
        }
    }

    tensor
}
