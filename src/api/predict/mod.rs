// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-and-predict endpoint module
//!
//! Provides POST / for running the detection pipeline over an upload.

pub mod handler;
pub mod view;

pub use handler::predict_handler;
pub use view::{
    compose, select, ComposeError, DeliveryMode, ImageRef, ResultView, SelectionPolicy,
    NO_CLASS_DETECTED,
};
