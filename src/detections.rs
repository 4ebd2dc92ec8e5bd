//! Detection sidecar files written by an external face detector.
//!
//! Accepted shapes:
//!
//! ```json
//! [ { "bounding_box": {...}, "landmarks": {...}, "confidence": 0.98 } ]
//! ```
//!
//! or, when the detector reports coordinates as fractions of the image size:
//!
//! ```json
//! { "normalized": true, "faces": [ ... ] }
//! ```

use anyhow::{Context, Result};
use passfit_vision::FaceDetectionResult;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
#[serde(untagged)]
enum Sidecar {
    Bare(Vec<FaceDetectionResult>),
    Wrapped {
        #[serde(default)]
        normalized: bool,
        faces: Vec<FaceDetectionResult>,
    },
}

/// Parse sidecar JSON into pixel-space detections for a `width` x `height` image.
pub fn parse_detections(raw: &str, width: u32, height: u32) -> Result<Vec<FaceDetectionResult>> {
    let sidecar: Sidecar = serde_json::from_str(raw).context("parsing detections")?;
    Ok(match sidecar {
        Sidecar::Bare(faces) => faces,
        Sidecar::Wrapped {
            normalized: false,
            faces,
        } => faces,
        Sidecar::Wrapped {
            normalized: true,
            faces,
        } => faces
            .iter()
            .map(|f| f.denormalize(width, height))
            .collect(),
    })
}

pub fn load_detections(path: &Path, width: u32, height: u32) -> Result<Vec<FaceDetectionResult>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading detections at {}", path.display()))?;
    parse_detections(&raw, width, height).with_context(|| format!("in {}", path.display()))
}

/// Default sidecar location: `photo.jpg` -> `photo.faces.json`.
pub fn sidecar_path(image: &Path) -> PathBuf {
    image.with_extension("faces.json")
}
