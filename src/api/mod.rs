// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod http_server;
pub mod pages;
pub mod predict;

pub use errors::ApiError;
pub use http_server::{router, start_server, AppState};
pub use pages::render_home;
pub use predict::{
    compose, predict_handler, DeliveryMode, ImageRef, ResultView, SelectionPolicy,
    NO_CLASS_DETECTED,
};
