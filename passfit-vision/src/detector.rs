//! Face detector seam.
//!
//! The detector itself is an external capability. A [`DetectorSession`] owns
//! one detector instance with an explicit lifecycle, so every worker that
//! processes photos holds its own session instead of sharing global state.

use anyhow::Result;
use image::DynamicImage;
use log::{debug, info};
use thiserror::Error;

use crate::face::{self, FaceDetectionResult};

/// Pluggable face detection backend.
///
/// Implementations return pixel-space results; detectors that work in
/// normalized coordinates should call [`FaceDetectionResult::denormalize`].
pub trait FaceDetector: Send {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<FaceDetectionResult>>;
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect(&mut self, img: &DynamicImage) -> Result<Vec<FaceDetectionResult>> {
        (**self).detect(img)
    }
}

/// Detector that always reports the same faces. Used when detections come
/// from a sidecar file produced by an external detector.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    faces: Vec<FaceDetectionResult>,
}

impl StaticDetector {
    pub fn new(faces: Vec<FaceDetectionResult>) -> Self {
        Self { faces }
    }
}

impl FaceDetector for StaticDetector {
    fn detect(&mut self, _img: &DynamicImage) -> Result<Vec<FaceDetectionResult>> {
        Ok(self.faces.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Busy,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("detector session is closed")]
    Closed,
}

/// Puts the session back to `Ready` when detection ends, including when the
/// detector panics and the panic is caught further up.
struct BusyGuard<'a>(&'a mut SessionState);

impl<'a> BusyGuard<'a> {
    fn enter(state: &'a mut SessionState) -> Self {
        *state = SessionState::Busy;
        Self(state)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *self.0 = SessionState::Ready;
    }
}

/// Post-processing applied to raw detector output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionFilter {
    /// Faces below this confidence are dropped.
    pub min_confidence: f64,
    /// IoU above which overlapping faces are merged. `None` disables NMS.
    pub nms_threshold: Option<f64>,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            nms_threshold: None,
        }
    }
}

impl DetectionFilter {
    pub fn apply(&self, faces: Vec<FaceDetectionResult>) -> Vec<FaceDetectionResult> {
        let faces: Vec<_> = faces
            .into_iter()
            .filter(|f| f.confidence >= self.min_confidence)
            .collect();
        match self.nms_threshold {
            Some(iou) => face::nms(&faces, iou),
            None => faces,
        }
    }
}

pub struct DetectorSession<D> {
    detector: Option<D>,
    state: SessionState,
    filter: DetectionFilter,
}

impl<D: FaceDetector> DetectorSession<D> {
    pub fn open(detector: D) -> Self {
        info!("detector session opened");
        Self {
            detector: Some(detector),
            state: SessionState::Ready,
            filter: DetectionFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: DetectionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the detector on one image. The session is `Busy` for the duration
    /// of the call and returns to `Ready` whether the detector succeeded,
    /// failed or panicked. `&mut self` rules out overlapping calls, so callers
    /// only ever see `Ready` or `Closed`.
    pub fn detect(&mut self, img: &DynamicImage) -> Result<Vec<FaceDetectionResult>> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed.into());
        }
        let detector = self.detector.as_mut().ok_or(SessionError::Closed)?;

        let guard = BusyGuard::enter(&mut self.state);
        let raw = detector.detect(img);
        drop(guard);

        let raw = raw?;
        let raw_count = raw.len();
        let faces = self.filter.apply(raw);
        debug!("detector returned {} face(s), {} kept", raw_count, faces.len());
        Ok(faces)
    }

    /// Release the detector. Further calls to [`detect`](Self::detect) fail.
    pub fn close(&mut self) -> Option<D> {
        if self.state != SessionState::Closed {
            info!("detector session closed");
        }
        self.state = SessionState::Closed;
        self.detector.take()
    }
}
