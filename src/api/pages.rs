// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Server-side rendering of the upload page
//!
//! One page serves both the empty form and the populated result; values
//! are HTML-escaped before insertion.

use super::predict::{ImageRef, ResultView};

/// Render the home page, optionally populated with a detection result
pub fn render_home(result: Option<&ResultView>) -> String {
    let result_section = result.map(render_result).unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Leaf Disease Detection</title>
  <style>
    body {{ font-family: sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }}
    form {{ margin-bottom: 2rem; }}
    img {{ max-width: 100%; border: 1px solid #ccc; }}
    .result {{ border-top: 1px solid #ddd; padding-top: 1rem; }}
  </style>
</head>
<body>
  <h1>Plant Leaf Disease Detection</h1>
  <form method="post" action="/" enctype="multipart/form-data">
    <input type="file" name="imagefile" accept="image/*" required>
    <button type="submit">Detect</button>
  </form>
{result_section}</body>
</html>
"#
    )
}

fn render_result(view: &ResultView) -> String {
    let mut section = String::from("  <div class=\"result\">\n");
    section.push_str(&format!(
        "    <h2>Prediction: {}</h2>\n",
        escape(&view.prediction)
    ));

    if let Some(cause) = &view.cause {
        section.push_str(&format!(
            "    <p><strong>Cause:</strong> {}</p>\n",
            escape(cause)
        ));
    }
    if let Some(remedy) = &view.remedy {
        section.push_str(&format!(
            "    <p><strong>Remedy:</strong> {}</p>\n",
            escape(remedy)
        ));
    }

    match &view.image {
        Some(ImageRef::Stored(filename)) => {
            section.push_str(&format!(
                "    <img src=\"/images/{}\" alt=\"annotated upload\">\n",
                escape(filename)
            ));
        }
        Some(ImageRef::Inline(data_uri)) => {
            // Data URIs are generated server-side from base64 output and
            // contain no characters needing escape
            section.push_str(&format!(
                "    <img src=\"{data_uri}\" alt=\"annotated upload\">\n"
            ));
        }
        None => {}
    }

    section.push_str("  </div>\n");
    section
}

/// Minimal HTML escaping for text and attribute positions
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
