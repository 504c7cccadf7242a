//! # Frame acquisition

use crate::prelude::v1::*;

/// A stream of video frames.
///
/// Implementations own the underlying capture handle exclusively and release
/// it when dropped, so the handle is released exactly once on every exit
/// path.
pub trait FrameSource {
    /// Pixel buffer type produced by this source.
    type Image;

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` when the stream has ended, `Err` on a read
    /// failure.
    fn read_frame(&mut self) -> Result<Option<Self::Image>>;

    /// Nominal frame rate of the stream.
    ///
    /// This will return `Some(rate)` if it is known. On realtime streams it
    /// may not always be known. In such cases, `None` is returned.
    fn frame_rate(&self) -> Option<f64>;
}
