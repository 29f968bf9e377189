// Version information for the Leafscan node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-onnx-detection-2026-08-05";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-05";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "onnx-detection",
    "cpu-inference",
    "stored-delivery",
    "inline-delivery",
    "lazy-model-load",
    "retention-policy",
];
