// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime session over the pretrained leaf-disease detector

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Axis;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::{postprocessing, preprocessing, Detection, DetectorParams};

/// Pretrained leaf-disease detection model
///
/// Runs CPU-only; the detection call is blocking and synchronous from the
/// caller's point of view.
#[derive(Clone)]
pub struct OnnxDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Class labels in class-index order
    labels: Vec<String>,
    params: DetectorParams,
}

impl std::fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("input_name", &self.input_name)
            .field("labels", &self.labels.len())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl OnnxDetector {
    /// Load the detection model from a file
    ///
    /// # Arguments
    /// - `model_path`: Path to the ONNX model file
    /// - `labels`: Class labels in class-index order
    /// - `params`: Inference tuning knobs
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>>(
        model_path: P,
        labels: Vec<String>,
        params: DetectorParams,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        // Validate path exists
        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        // Load ONNX model with CPU-only execution
        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("Detection model loaded - input: {}", input_name);
        info!("✅ Detection model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            labels,
            params,
        })
    }

    /// Class labels in class-index order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    /// Run the detector over one image
    ///
    /// Returns detections in pixel coordinates of the input image. An empty
    /// vector is a valid "no class detected" outcome, not an error.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let rgb = image.to_rgb8();
        let input = preprocessing::image_to_tensor(&rgb, self.params.input_size);
        let (scale_x, scale_y) = preprocessing::scale_factors(&rgb, self.params.input_size);

        // Run inference
        let mut session = self.session.lock().unwrap();

        let input_value =
            Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let output_shape = output_tensor.shape().to_vec();
        debug!("Detection output shape: {:?}", output_shape);

        // Expected shape: [1, 4 + num_classes, candidates]
        let output = output_tensor
            .view()
            .into_dimensionality::<ndarray::Ix3>()
            .context(format!("Unexpected output shape: {:?}", output_shape))?;
        let view = output.index_axis(Axis(0), 0);

        let detections =
            postprocessing::decode_output(view, scale_x, scale_y, &self.labels, &self.params);

        debug!("Detected {} regions", detections.len());

        Ok(detections)
    }
}
