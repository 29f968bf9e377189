// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Result-page view model and its composer

use clap::ValueEnum;
use image::RgbImage;
use thiserror::Error;

use crate::catalog::{DiseaseCatalog, NOT_AVAILABLE};
use crate::storage::{ImageStore, StoreError};
use crate::vision::detector::Detection;
use crate::vision::image_utils::{encode_jpeg, to_jpeg_data_uri, ImageError};

/// Marker rendered when the detector returns no detections
pub const NO_CLASS_DETECTED: &str = "No class detected";

/// How the annotated image reaches the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeliveryMode {
    /// Persist to the upload directory, retrievable via `/images/<name>`
    Stored,
    /// Embed as a base64 data URI, nothing persisted
    Inline,
}

/// Which detection drives the catalog lookup when several are present
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectionPolicy {
    First,
    Last,
    HighestConfidence,
}

/// Reference to the annotated image in the rendered page
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    /// Retrieval filename under the upload directory
    Stored(String),
    /// Complete `data:image/jpeg;base64,...` URI
    Inline(String),
}

/// Values needed to render the result page
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    /// Detected class label, free-text error, or [`NO_CLASS_DETECTED`]
    pub prediction: String,
    pub cause: Option<String>,
    pub remedy: Option<String>,
    pub image: Option<ImageRef>,
}

impl ResultView {
    /// View for the designed "no result" branch
    pub fn no_detection() -> Self {
        Self {
            prediction: NO_CLASS_DETECTED.to_string(),
            cause: None,
            remedy: None,
            image: None,
        }
    }

    /// View carrying a free-text failure in place of a prediction
    pub fn failure(message: String) -> Self {
        Self {
            prediction: message,
            cause: None,
            remedy: None,
            image: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Encode(#[from] ImageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pick the detection that drives the textual lookup
pub fn select<'a>(policy: SelectionPolicy, detections: &'a [Detection]) -> Option<&'a Detection> {
    match policy {
        SelectionPolicy::First => detections.first(),
        SelectionPolicy::Last => detections.last(),
        SelectionPolicy::HighestConfidence => detections.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        }),
    }
}

/// Assemble the result page values and deliver the annotated image
///
/// With no detections, returns the "no class detected" view and touches
/// neither the store nor the encoder, regardless of delivery mode.
pub fn compose(
    original_filename: &str,
    detections: &[Detection],
    annotated: &RgbImage,
    catalog: &DiseaseCatalog,
    policy: SelectionPolicy,
    delivery: DeliveryMode,
    store: &ImageStore,
) -> Result<ResultView, ComposeError> {
    let Some(selected) = select(policy, detections) else {
        return Ok(ResultView::no_detection());
    };

    let entry = catalog.lookup(&selected.label);
    let cause = entry.map_or(NOT_AVAILABLE, |e| e.cause).to_string();
    let remedy = entry.map_or(NOT_AVAILABLE, |e| e.remedy).to_string();

    let bytes = encode_jpeg(annotated)?;
    let image = match delivery {
        DeliveryMode::Stored => ImageRef::Stored(store.save_annotated(original_filename, &bytes)?),
        DeliveryMode::Inline => ImageRef::Inline(to_jpeg_data_uri(&bytes)),
    };

    Ok(ResultView {
        prediction: selected.label.clone(),
        cause: Some(cause),
        remedy: Some(remedy),
        image: Some(image),
    })
}
