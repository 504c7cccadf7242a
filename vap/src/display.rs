//! # Frame presentation

use crate::prelude::v1::*;

/// Renders annotated frames and reports user quit requests.
///
/// Implementations own the window or surface exclusively and destroy it when
/// dropped, so the surface is released exactly once on every exit path.
pub trait DisplaySink {
    /// Pixel buffer type consumed by this sink.
    type Image;

    /// Draw overlays for `msg` and show the frame.
    fn render(&mut self, msg: &DetectMsg<Self::Image>) -> Result<()>;

    /// Poll for a pending quit request. Called once per displayed frame.
    fn poll_quit(&mut self) -> Result<bool>;
}
