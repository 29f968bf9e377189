// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection overlay drawing
//!
//! Draws an axis-aligned rectangle and a `label: confidence` caption for
//! each detection. Output dimensions always equal input dimensions. Label
//! text needs a TrueType font; without one, boxes are drawn without text.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::warn;

use super::detector::Detection;

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
const LABEL_FONT_SIZE: f32 = 18.0;
// Caption sits this many pixels above the box's top-left corner
const LABEL_OFFSET: i32 = 20;

/// Draws detection overlays onto a copy of the request image
pub struct Annotator {
    font: Option<FontArc>,
}

impl Annotator {
    /// Create an annotator, loading the label font from `font_path`
    ///
    /// A missing or unreadable font degrades to box-only annotation.
    pub fn new(font_path: Option<&Path>) -> Self {
        let font = font_path.and_then(|path| match std::fs::read(path) {
            Ok(bytes) => match FontArc::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!("⚠️ Failed to parse label font {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("⚠️ Failed to read label font {}: {}", path.display(), e);
                None
            }
        });

        if font.is_none() {
            warn!("No label font available, boxes will be drawn without captions");
        }

        Self { font }
    }

    /// Annotator that never draws captions
    pub fn without_font() -> Self {
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw a rectangle and caption for every detection
    ///
    /// Returns a new buffer; the input image is not modified and the output
    /// has identical dimensions.
    pub fn annotate(&self, image: &DynamicImage, detections: &[Detection]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for detection in detections {
            self.draw_detection(&mut canvas, detection);
        }
        canvas
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
        let width = canvas.width() as i32;
        let height = canvas.height() as i32;

        // Clamp to image bounds; the drawing primitive's own clipping is
        // inherited beyond this
        let x1 = (detection.x1.floor() as i32).clamp(0, width - 1);
        let y1 = (detection.y1.floor() as i32).clamp(0, height - 1);
        let x2 = (detection.x2.ceil() as i32).clamp(0, width - 1);
        let y2 = (detection.y2.ceil() as i32).clamp(0, height - 1);

        if x1 >= x2 || y1 >= y2 {
            return;
        }

        // 2px border: outer rectangle plus a 1px inset
        for inset in 0..2i32 {
            let w = x2 - x1 - 2 * inset;
            let h = y2 - y1 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32 + 1, h as u32 + 1);
            draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
        }

        if let Some(font) = &self.font {
            let caption = format!("{}: {:.2}", detection.label, detection.confidence);
            let text_y = (y1 - LABEL_OFFSET).max(0);
            draw_text_mut(
                canvas,
                BOX_COLOR,
                x1,
                text_y,
                PxScale::from(LABEL_FONT_SIZE),
                font,
                &caption,
            );
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::without_font()
    }
}
