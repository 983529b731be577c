use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, warn};

use super::frames::{Frame, FrameSource};
use super::{Classifier, ClassifyError};
use crate::config::{AppConfig, DEFAULT_FRAME_STRIDE, DEFAULT_MIN_CONFIDENCE};
use crate::storage::models::FileType;

/// Box corners in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// One object found in a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_index: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// An object-detection model.
pub trait Detector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, ClassifyError>;

    /// Label name for each class index the model can emit.
    fn labels(&self) -> &[String];
}

/// Classifier that runs a [`Detector`] over frames from a [`FrameSource`].
///
/// Images get one detection pass. Videos are sampled every `stride` frames
/// starting with the first, and labels are unioned across samples.
pub struct DetectionClassifier<D, S> {
    detector: D,
    frames: S,
    stride: usize,
    min_confidence: f32,
}

impl<D: Detector, S: FrameSource> DetectionClassifier<D, S> {
    pub fn new(detector: D, frames: S) -> Self {
        Self {
            detector,
            frames,
            stride: DEFAULT_FRAME_STRIDE,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn from_config(detector: D, frames: S, config: &AppConfig) -> Self {
        Self::new(detector, frames)
            .with_stride(config.video_frame_stride)
            .with_min_confidence(config.min_confidence)
    }

    /// Zero is treated as one (every frame).
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    fn labels_in(&self, frame: &Frame, into: &mut BTreeSet<String>) -> Result<(), ClassifyError> {
        let table = self.detector.labels();
        for detection in self.detector.detect(frame)? {
            if detection.confidence < self.min_confidence {
                continue;
            }
            match table.get(detection.class_index) {
                Some(label) => {
                    into.insert(label.clone());
                }
                None => warn!(
                    "Detector returned class index {} outside its {} labels",
                    detection.class_index,
                    table.len()
                ),
            }
        }
        Ok(())
    }
}

impl<D: Detector, S: FrameSource> Classifier for DetectionClassifier<D, S> {
    fn classify(
        &self,
        path: &Path,
        file_type: FileType,
    ) -> Result<BTreeSet<String>, ClassifyError> {
        let mut labels = BTreeSet::new();
        match file_type {
            FileType::Image => {
                let frame = self.frames.still(path)?;
                self.labels_in(&frame, &mut labels)?;
            }
            FileType::Video => {
                let mut sampled = 0usize;
                for frame in self.frames.video_frames(path)?.step_by(self.stride) {
                    self.labels_in(&frame?, &mut labels)?;
                    sampled += 1;
                }
                debug!("Sampled {} frames from {}", sampled, path.display());
            }
        }
        Ok(labels)
    }
}
