//! # Motion detection

use crate::prelude::v1::*;

/// Stateful motion detector.
///
/// Implementations may retain per-frame history; given an identical,
/// deterministic frame sequence, the produced detection sequence is expected
/// to be identical as well.
pub trait MotionDetector {
    /// Pixel buffer type consumed by this detector.
    type Image;

    /// Detect motion regions in `frame` relative to retained history.
    ///
    /// Returned rectangles are in image pixel coordinates and may extend
    /// outside the image bounds.
    fn detect(&mut self, frame: &Self::Image) -> Result<Vec<BoundingBox>>;
}
