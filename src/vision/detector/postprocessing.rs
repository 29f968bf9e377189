// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection output decoding
//!
//! The model emits a [1, 4 + num_classes, candidates] tensor: center-format
//! box coordinates in model space followed by per-class scores. Decoding
//! filters by confidence, maps boxes back to image space, collapses
//! overlapping same-class boxes and caps the result count.

use ndarray::{s, ArrayView2};

use super::{Detection, DetectorParams};

/// Decode a raw output view into detections in image-space coordinates
///
/// `view` is the batch-stripped [4 + num_classes, candidates] output;
/// `scale_x`/`scale_y` map model space back to the original image.
pub fn decode_output(
    view: ArrayView2<f32>,
    scale_x: f32,
    scale_y: f32,
    labels: &[String],
    params: &DetectorParams,
) -> Vec<Detection> {
    let rows = view.shape()[0];
    let candidates = view.shape()[1];
    if rows <= 4 {
        return Vec::new();
    }

    let mut detections = Vec::new();
    for i in 0..candidates {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        else {
            continue;
        };

        if score < params.confidence_threshold {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        detections.push(Detection {
            x1: (cx - w / 2.0) * scale_x,
            y1: (cy - h / 2.0) * scale_y,
            x2: (cx + w / 2.0) * scale_x,
            y2: (cy + h / 2.0) * scale_y,
            confidence: score,
            class_id,
            label: labels
                .get(class_id)
                .cloned()
                .unwrap_or_else(|| format!("class_{class_id}")),
        });
    }

    let mut kept = non_maximum_suppression(detections, params.iou_threshold);
    kept.truncate(params.max_detections);
    kept
}

/// Intersection over union of two detections
pub fn iou(a: &Detection, b: &Detection) -> f32 {
    let inter_x1 = a.x1.max(b.x1);
    let inter_y1 = a.y1.max(b.y1);
    let inter_x2 = a.x2.min(b.x2);
    let inter_y2 = a.y2.min(b.y2);

    let inter_area = (inter_x2 - inter_x1).max(0.0) * (inter_y2 - inter_y1).max(0.0);
    let union_area = a.area() + b.area() - inter_area;
    if union_area <= 0.0 {
        0.0
    } else {
        inter_area / union_area
    }
}

/// Greedy per-class non-maximum suppression
///
/// Returns the survivors sorted by descending confidence.
pub fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_unstable_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = kept.iter().any(|winner| {
            winner.class_id == candidate.class_id && iou(winner, &candidate) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
