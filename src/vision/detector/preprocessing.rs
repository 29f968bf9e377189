// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detection model
//!
//! The model takes a square NCHW float tensor normalized to [0, 1]. The
//! image is resized without letterboxing; output decoding undoes the
//! per-axis scaling.

use image::{imageops::FilterType, RgbImage};
use ndarray::Array4;

/// Resize to the model's input size and convert to a [1, 3, S, S] tensor
pub fn image_to_tensor(rgb: &RgbImage, input_size: u32) -> Array4<f32> {
    let size = input_size as usize;
    let resized = image::imageops::resize(rgb, input_size, input_size, FilterType::Nearest);

    let mut input = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }
    input
}

/// Per-axis factors mapping model-space coordinates back to image space
pub fn scale_factors(rgb: &RgbImage, input_size: u32) -> (f32, f32) {
    (
        rgb.width() as f32 / input_size as f32,
        rgb.height() as f32 / input_size as f32,
    )
}
