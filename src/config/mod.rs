// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration
//!
//! Every knob is a CLI flag with an env-var fallback, so deployments can
//! configure the node through either. `.env` files are honored via dotenv
//! in main.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::api::predict::{DeliveryMode, SelectionPolicy};
use crate::storage::RetentionPolicy;
use crate::vision::accessor::LoadMode;
use crate::vision::detector::{DetectorParams, DISEASE_CLASSES};

#[derive(Parser, Debug, Clone)]
#[command(name = "leafscan-node", version, about = "Leaf-disease detection web service")]
pub struct AppConfig {
    /// Socket address to serve on
    #[arg(long, env = "LEAFSCAN_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Path to the pretrained ONNX detection model
    #[arg(long, env = "LEAFSCAN_MODEL_PATH", default_value = "./models/leaf-disease.onnx")]
    pub model_path: PathBuf,

    /// Directory holding raw uploads and annotated derivatives
    #[arg(long, env = "LEAFSCAN_UPLOAD_DIR", default_value = "./images")]
    pub upload_dir: PathBuf,

    /// Directory holding static assets (favicon)
    #[arg(long, env = "LEAFSCAN_STATIC_DIR", default_value = "./static")]
    pub static_dir: PathBuf,

    /// TrueType font for box captions; captions are skipped without one
    #[arg(long, env = "LEAFSCAN_FONT_PATH")]
    pub font_path: Option<PathBuf>,

    /// When the detector session is constructed
    #[arg(long, env = "LEAFSCAN_LOAD_MODE", value_enum, default_value = "eager")]
    pub load_mode: LoadMode,

    /// How the annotated image reaches the client
    #[arg(long, env = "LEAFSCAN_DELIVERY", value_enum, default_value = "stored")]
    pub delivery: DeliveryMode,

    /// Which detection drives the catalog lookup
    #[arg(long, env = "LEAFSCAN_SELECTION", value_enum, default_value = "highest-confidence")]
    pub selection: SelectionPolicy,

    /// Minimum confidence for a detection to survive
    #[arg(long, env = "LEAFSCAN_CONF_THRESHOLD", default_value_t = 0.25)]
    pub confidence_threshold: f32,

    /// IoU above which overlapping same-class boxes are suppressed
    #[arg(long, env = "LEAFSCAN_IOU_THRESHOLD", default_value_t = 0.45)]
    pub iou_threshold: f32,

    /// Cap on detections returned per image
    #[arg(long, env = "LEAFSCAN_MAX_DETECTIONS", default_value_t = 100)]
    pub max_detections: usize,

    /// Square input size the model expects
    #[arg(long, env = "LEAFSCAN_INPUT_SIZE", default_value_t = 640)]
    pub input_size: u32,

    /// Remove stored images older than this many hours; unset keeps
    /// everything forever
    #[arg(long, env = "LEAFSCAN_RETENTION_HOURS")]
    pub retention_hours: Option<u64>,
}

impl AppConfig {
    /// Retention policy for the image store
    pub fn retention(&self) -> RetentionPolicy {
        match self.retention_hours {
            Some(hours) => RetentionPolicy::MaxAge(Duration::from_secs(hours * 3600)),
            None => RetentionPolicy::KeepAll,
        }
    }

    /// Inference tuning knobs for the detector
    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }

    /// Class labels in class-index order
    pub fn labels(&self) -> Vec<String> {
        DISEASE_CLASSES.iter().map(|s| s.to_string()).collect()
    }
}
