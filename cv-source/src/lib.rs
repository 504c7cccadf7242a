//! OpenCV video capture source

use log::*;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS};
use vap::prelude::v1::*;

/// Frame source backed by `opencv::videoio::VideoCapture`.
///
/// The capture handle is owned exclusively and released when the source is
/// dropped.
pub struct CvSource {
    capture: VideoCapture,
}

impl CvSource {
    /// Open a video file.
    ///
    /// # Arguments
    ///
    /// * `path` - path to a readable video file.
    pub fn open(path: &str) -> Result<Self> {
        let capture = VideoCapture::from_file(path, CAP_ANY)?;

        if !capture.is_opened()? {
            return Err(anyhow!("failed to open video: {}", path));
        }

        info!(target: "streamer", "opened video: {}", path);

        Ok(Self { capture })
    }
}

impl FrameSource for CvSource {
    type Image = Mat;

    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();

        if !self.capture.read(&mut frame)? || frame.empty()? {
            return Ok(None);
        }

        Ok(Some(frame))
    }

    fn frame_rate(&self) -> Option<f64> {
        self.capture.get(CAP_PROP_FPS).ok()
    }
}
