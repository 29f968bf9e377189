// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision pipeline for leaf-disease detection
//!
//! This module provides:
//! - Upload decoding and annotated-image encoding
//! - The ONNX detection model and its load-mode accessor
//! - Bounding-box and caption drawing
//!
//! Inference runs on CPU only.

pub mod accessor;
pub mod annotator;
pub mod detector;
pub mod image_utils;

pub use accessor::{LoadMode, ModelAccessor};
pub use annotator::Annotator;
pub use detector::{Detection, DetectorParams, OnnxDetector, DISEASE_CLASSES};
pub use image_utils::{
    decode_image_bytes, detect_format, encode_jpeg, format_to_extension, to_jpeg_data_uri,
    ImageError, ImageInfo,
};
