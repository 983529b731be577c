use image::RgbImage;
use std::path::Path;

use super::ClassifyError;

/// A decoded RGB frame handed to a detector.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

pub type FrameIter<'a> = Box<dyn Iterator<Item = Result<Frame, ClassifyError>> + 'a>;

/// Decodes media into frames.
pub trait FrameSource: Send + Sync {
    fn still(&self, path: &Path) -> Result<Frame, ClassifyError>;

    /// Every frame of a video, in order. Sampling is the caller's job.
    fn video_frames<'a>(&'a self, path: &Path) -> Result<FrameIter<'a>, ClassifyError>;
}

/// Still images through the `image` crate. Videos are reported as
/// unsupported, which leaves them unlinked until a video-capable source is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFrameSource;

impl FrameSource for ImageFrameSource {
    fn still(&self, path: &Path) -> Result<Frame, ClassifyError> {
        match image::open(path) {
            Ok(img) => Ok(Frame::new(img.to_rgb8())),
            Err(image::ImageError::IoError(e)) => Err(ClassifyError::Io(e)),
            Err(e) => Err(ClassifyError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn video_frames<'a>(&'a self, path: &Path) -> Result<FrameIter<'a>, ClassifyError> {
        Err(ClassifyError::Unsupported(format!(
            "no video decoder available for {}",
            path.display()
        )))
    }
}
