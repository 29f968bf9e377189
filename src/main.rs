// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use leafscan_node::{
    api::http_server::{start_server, AppState},
    catalog::DiseaseCatalog,
    config::AppConfig,
    storage::ImageStore,
    vision::{Annotator, ModelAccessor, DISEASE_CLASSES},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = AppConfig::parse();

    println!("🚀 Starting Leafscan Node...\n");
    println!("📦 BUILD VERSION: {}", leafscan_node::version::VERSION);
    println!();

    let catalog = Arc::new(DiseaseCatalog::builtin());
    let uncovered = catalog.validate_labels(&DISEASE_CLASSES);
    if uncovered.is_empty() {
        tracing::info!("Catalog covers all {} model labels", DISEASE_CLASSES.len());
    } else {
        // The catalog and model label set are maintained independently;
        // uncovered labels render as "Not Available" at lookup time
        tracing::warn!("⚠️ Model labels without catalog entries: {:?}", uncovered);
    }

    let store = Arc::new(ImageStore::new(&config.upload_dir, config.retention())?);
    tracing::info!(
        "Image store at {} (retention: {:?})",
        config.upload_dir.display(),
        store.retention()
    );

    let annotator = Arc::new(Annotator::new(config.font_path.as_deref()));

    tracing::info!(
        "Initializing detector from {} ({:?} mode)",
        config.model_path.display(),
        config.load_mode
    );
    let accessor = Arc::new(
        ModelAccessor::new(
            config.load_mode,
            &config.model_path,
            config.labels(),
            config.detector_params(),
        )
        .await?,
    );

    let state = AppState {
        accessor,
        annotator,
        catalog,
        store,
        delivery: config.delivery,
        selection: config.selection,
        static_dir: config.static_dir.clone(),
    };

    start_server(config.bind, state).await
}
