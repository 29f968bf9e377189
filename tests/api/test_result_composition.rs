// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end composition tests: annotate, deliver, verify pixels
//!
//! These run the annotator and composer against real image buffers with a
//! fixed detection set, checking the rendered values and the annotated
//! pixels without needing the model artifact.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use leafscan_node::{
    api::predict::{compose, DeliveryMode, ImageRef, SelectionPolicy},
    catalog::DiseaseCatalog,
    storage::{ImageStore, RetentionPolicy},
    vision::{Annotator, Detection},
};

fn early_blight_detection() -> Detection {
    Detection {
        x1: 10.0,
        y1: 10.0,
        x2: 50.0,
        y2: 50.0,
        confidence: 0.87,
        class_id: 0,
        label: "Early Blight".to_string(),
    }
}

fn test_store() -> (tempfile::TempDir, ImageStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = ImageStore::new(dir.path(), RetentionPolicy::KeepAll).unwrap();
    (dir, store)
}

#[test]
fn test_early_blight_scenario() {
    let (_dir, store) = test_store();
    let catalog = DiseaseCatalog::builtin();
    let annotator = Annotator::without_font();

    let image = DynamicImage::new_rgb8(64, 64);
    let detections = vec![early_blight_detection()];
    let annotated = annotator.annotate(&image, &detections);

    // Drawing never resizes
    assert_eq!(annotated.width(), image.width());
    assert_eq!(annotated.height(), image.height());

    let view = compose(
        "leaf.jpg",
        &detections,
        &annotated,
        &catalog,
        SelectionPolicy::HighestConfidence,
        DeliveryMode::Stored,
        &store,
    )
    .unwrap();

    assert_eq!(view.prediction, "Early Blight");
    let entry = catalog.lookup("Early Blight").unwrap();
    assert_eq!(view.cause.as_deref(), Some(entry.cause));
    assert_eq!(view.remedy.as_deref(), Some(entry.remedy));

    // The stored derivative decodes to the rectangle at (10,10)-(50,50)
    let ImageRef::Stored(name) = view.image.unwrap() else {
        panic!("expected stored delivery");
    };
    assert_eq!(name, "annotated_leaf.jpg");
    let stored = image::load_from_memory(&store.read(&name).unwrap())
        .unwrap()
        .to_rgb8();
    assert_eq!(stored.dimensions(), (64, 64));
    // Box pixels differ from the untouched black background
    assert_ne!(*stored.get_pixel(30, 10), image::Rgb([0, 0, 0]));
    assert_ne!(*stored.get_pixel(10, 30), image::Rgb([0, 0, 0]));
    assert_eq!(*stored.get_pixel(30, 30), image::Rgb([0, 0, 0]));
}

#[test]
fn test_delivery_mode_equivalence_end_to_end() {
    let (_dir, store) = test_store();
    let catalog = DiseaseCatalog::builtin();
    let annotator = Annotator::without_font();

    let image = DynamicImage::new_rgb8(48, 32);
    let detections = vec![early_blight_detection()];
    let annotated = annotator.annotate(&image, &detections);

    let stored_view = compose(
        "leaf.jpg",
        &detections,
        &annotated,
        &catalog,
        SelectionPolicy::HighestConfidence,
        DeliveryMode::Stored,
        &store,
    )
    .unwrap();
    let inline_view = compose(
        "leaf.jpg",
        &detections,
        &annotated,
        &catalog,
        SelectionPolicy::HighestConfidence,
        DeliveryMode::Inline,
        &store,
    )
    .unwrap();

    let stored_bytes = match stored_view.image.unwrap() {
        ImageRef::Stored(name) => store.read(&name).unwrap(),
        other => panic!("unexpected {other:?}"),
    };
    let inline_bytes = match inline_view.image.unwrap() {
        ImageRef::Inline(uri) => STANDARD
            .decode(uri.trim_start_matches("data:image/jpeg;base64,"))
            .unwrap(),
        other => panic!("unexpected {other:?}"),
    };

    let stored_pixels = image::load_from_memory(&stored_bytes).unwrap().to_rgb8();
    let inline_pixels = image::load_from_memory(&inline_bytes).unwrap().to_rgb8();
    assert_eq!(stored_pixels.as_raw(), inline_pixels.as_raw());
}

#[test]
fn test_repeated_uploads_overwrite_derivatives() {
    let (_dir, store) = test_store();
    let catalog = DiseaseCatalog::builtin();
    let annotator = Annotator::without_font();
    let detections = vec![early_blight_detection()];

    for size in [64u32, 96u32] {
        let image = DynamicImage::new_rgb8(size, size);
        let annotated = annotator.annotate(&image, &detections);
        let view = compose(
            "leaf.jpg",
            &detections,
            &annotated,
            &catalog,
            SelectionPolicy::HighestConfidence,
            DeliveryMode::Stored,
            &store,
        )
        .unwrap();
        assert_eq!(view.prediction, "Early Blight");
    }

    // The second pass overwrote the first derivative
    let stored = image::load_from_memory(&store.read("annotated_leaf.jpg").unwrap())
        .unwrap()
        .to_rgb8();
    assert_eq!(stored.dimensions(), (96, 96));
}

#[test]
fn test_no_detection_has_no_image_in_either_mode() {
    let (_dir, store) = test_store();
    let catalog = DiseaseCatalog::builtin();
    let annotator = Annotator::without_font();

    let image = DynamicImage::new_rgb8(32, 32);
    let annotated = annotator.annotate(&image, &[]);

    for delivery in [DeliveryMode::Stored, DeliveryMode::Inline] {
        let view = compose(
            "leaf.jpg",
            &[],
            &annotated,
            &catalog,
            SelectionPolicy::HighestConfidence,
            delivery,
            &store,
        )
        .unwrap();
        assert_eq!(view.prediction, "No class detected");
        assert!(view.image.is_none());
    }

    // Nothing was persisted for the empty result
    assert!(store.read("annotated_leaf.jpg").is_err());
}
