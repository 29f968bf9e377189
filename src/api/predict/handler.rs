// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-and-predict endpoint handler

use axum::extract::{Multipart, State};
use axum::response::Html;
use tracing::{debug, info, warn};

use super::view::{compose, ResultView};
use crate::api::http_server::AppState;
use crate::api::pages::render_home;
use crate::api::errors::ApiError;
use crate::vision::decode_image_bytes;

/// Multipart field carrying the uploaded photo
const UPLOAD_FIELD: &str = "imagefile";

/// Fallback name when the browser sends a file without one
const DEFAULT_FILENAME: &str = "upload.jpg";

/// POST / - Run the detection pipeline over an uploaded leaf photo
///
/// Accepts a multipart form with an `imagefile` field and renders the home
/// page populated with the prediction, cause/remedy text and the annotated
/// image. The flow is a straight line (save upload, detect, annotate,
/// compose, render) with no retry and no branching back.
///
/// # Errors
/// - 400 Bad Request: missing/empty file field, or a payload that is not a
///   decodable image
/// - 500 Internal Server Error: storage or encoding failure
///
/// A failing detection call is not an error response: it renders as free
/// text in place of a prediction.
pub async fn predict_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Html<String>, ApiError> {
    // 1. Pull the upload out of the form
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let filename = field
                .file_name()
                .filter(|name| !name.is_empty())
                .unwrap_or(DEFAULT_FILENAME)
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| ApiError::ValidationError {
        field: UPLOAD_FIELD.to_string(),
        message: "file field is required".to_string(),
    })?;

    if bytes.is_empty() {
        return Err(ApiError::ValidationError {
            field: UPLOAD_FIELD.to_string(),
            message: "uploaded file is empty".to_string(),
        });
    }

    debug!("Upload received: {} ({} bytes)", filename, bytes.len());

    // 2. Persist the raw upload under its original filename
    state
        .store
        .save_upload(&filename, &bytes)
        .map_err(|e| ApiError::InvalidRequest(format!("Could not store upload: {e}")))?;

    // 3. Decode for annotation
    let (image, image_info) = decode_image_bytes(&bytes).map_err(|e| {
        warn!("Failed to decode upload {}: {}", filename, e);
        ApiError::InvalidRequest(format!("Invalid image: {e}"))
    })?;

    debug!(
        "Decoded upload: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    // 4. Run the detector; a failure renders as text, not as an error page
    let detections = match state.accessor.detect(&image).await {
        Ok(detections) => detections,
        Err(e) => {
            warn!("Detection failed for {}: {:#}", filename, e);
            let view = ResultView::failure(format!("Detection failed: {e}"));
            return Ok(Html(render_home(Some(&view))));
        }
    };

    info!(
        "Detection complete for {}: {} regions",
        filename,
        detections.len()
    );

    // 5. Draw the overlays
    let annotated = state.annotator.annotate(&image, &detections);

    // 6. Compose the page values and deliver the annotated image
    let view = compose(
        &filename,
        &detections,
        &annotated,
        &state.catalog,
        state.selection,
        state.delivery,
        &state.store,
    )
    .map_err(|e| ApiError::InternalError(format!("Failed to prepare result: {e}")))?;

    Ok(Html(render_home(Some(&view))))
}
