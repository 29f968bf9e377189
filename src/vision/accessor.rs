// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Model accessor: owns when the detector session is constructed
//!
//! Three load policies are supported. `Eager` builds the session at process
//! start, `Lazy` builds it on first request and memoizes it behind a
//! one-time-initialization cell, `PerRequest` builds a fresh session every
//! call and caches nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::ValueEnum;
use image::DynamicImage;
use tokio::sync::OnceCell;
use tracing::info;

use super::detector::{Detection, DetectorParams, OnnxDetector};

/// When the detector session is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoadMode {
    /// Build the session at process start
    Eager,
    /// Build on first request, memoize afterwards
    Lazy,
    /// Build a fresh session on every request
    PerRequest,
}

/// Obtains a ready-to-query detector according to the configured load mode
///
/// The memoized handle is the only shared mutable state in the pipeline;
/// the cell guarantees at most one initialization even when concurrent
/// first requests race, and readers observe either "not yet initialized"
/// or a fully constructed handle.
pub struct ModelAccessor {
    mode: LoadMode,
    model_path: PathBuf,
    labels: Vec<String>,
    params: DetectorParams,
    cached: OnceCell<Arc<OnnxDetector>>,
}

impl ModelAccessor {
    /// Create an accessor; `Eager` mode loads the model before returning
    pub async fn new<P: AsRef<Path>>(
        mode: LoadMode,
        model_path: P,
        labels: Vec<String>,
        params: DetectorParams,
    ) -> Result<Self> {
        let accessor = Self {
            mode,
            model_path: model_path.as_ref().to_path_buf(),
            labels,
            params,
            cached: OnceCell::new(),
        };

        if mode == LoadMode::Eager {
            let detector = accessor.load().await?;
            let _ = accessor.cached.set(detector);
            info!("Detection model loaded eagerly at startup");
        }

        Ok(accessor)
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Whether the memoized handle has been constructed
    pub fn is_loaded(&self) -> bool {
        self.cached.initialized()
    }

    async fn load(&self) -> Result<Arc<OnnxDetector>> {
        let detector = OnnxDetector::new(
            &self.model_path,
            self.labels.clone(),
            self.params.clone(),
        )
        .await?;
        Ok(Arc::new(detector))
    }

    /// Run detection over one image, constructing the session per the
    /// configured load mode
    pub async fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        match self.mode {
            LoadMode::PerRequest => {
                let detector = self.load().await?;
                detector.detect(image)
            }
            LoadMode::Eager | LoadMode::Lazy => {
                let detector = self.cached.get_or_try_init(|| self.load()).await?;
                detector.detect(image)
            }
        }
    }
}

impl std::fmt::Debug for ModelAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAccessor")
            .field("mode", &self.mode)
            .field("model_path", &self.model_path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
