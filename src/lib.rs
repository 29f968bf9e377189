// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod catalog;
pub mod config;
pub mod storage;
pub mod version;
pub mod vision;

// Re-export the types the binary and the integration tests reach for
pub use api::{
    compose, render_home, router, start_server, ApiError, AppState, DeliveryMode, ImageRef,
    ResultView, SelectionPolicy,
};
pub use catalog::{DiseaseCatalog, DiseaseEntry};
pub use config::AppConfig;
pub use storage::{ImageStore, RetentionPolicy, StoreError};
pub use vision::{
    Annotator, Detection, DetectorParams, LoadMode, ModelAccessor, OnnxDetector, DISEASE_CLASSES,
};
