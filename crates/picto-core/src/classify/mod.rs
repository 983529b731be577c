//! Bridge between the sync engine and an external object detector.
//!
//! The engine only sees [`Classifier`]. [`DetectionClassifier`] builds one
//! from a [`Detector`] (the model) and a [`FrameSource`] (decoding).

pub mod detector;
pub mod frames;

use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::storage::models::FileType;
use crate::storage::Database;

pub use detector::{BoundingBox, Detection, DetectionClassifier, Detector};
pub use frames::{Frame, FrameSource, ImageFrameSource};

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Unsupported media: {0}")]
    Unsupported(String),

    #[error("Detector failed: {0}")]
    Detector(String),
}

/// Produces the set of labels found in a media file. An empty set is a
/// valid answer, not an error.
pub trait Classifier: Send + Sync {
    fn classify(
        &self,
        path: &Path,
        file_type: FileType,
    ) -> Result<BTreeSet<String>, ClassifyError>;
}

/// Store labels for a media row: insert-or-get each class, insert-or-ignore
/// each tag. Repeating the call for the same labels changes nothing.
pub fn persist_labels(
    db: &Database,
    media_id: i64,
    labels: &BTreeSet<String>,
) -> rusqlite::Result<usize> {
    let added = db.link_classes(media_id, labels)?;
    debug!("Media {}: {} labels, {} new tags", media_id, labels.len(), added);
    Ok(added)
}
