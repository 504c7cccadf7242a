//! OpenCV window presenter

pub mod overlay;

use chrono::Local;
use log::*;
use opencv::highgui;
use opencv::prelude::*;
use vap::prelude::v1::*;

/// Window title.
pub const WINDOW_TITLE: &str = "VAP - Video Analytics";
/// Initial window size.
pub const WINDOW_SIZE: (i32, i32) = (960, 540);
/// Key that requests shutdown.
pub const QUIT_KEY: char = 'q';

/// Display sink backed by an `opencv::highgui` window.
///
/// The window is created on construction and destroyed when the sink is
/// dropped, exactly once on every exit path.
pub struct CvDisplay {
    blur_detections: bool,
}

impl CvDisplay {
    /// Create the window.
    ///
    /// # Arguments
    ///
    /// * `blur_detections` - blur detection regions before drawing outlines.
    pub fn create(blur_detections: bool) -> Result<Self> {
        highgui::named_window(WINDOW_TITLE, highgui::WINDOW_NORMAL)?;
        highgui::resize_window(WINDOW_TITLE, WINDOW_SIZE.0, WINDOW_SIZE.1)?;

        Ok(Self { blur_detections })
    }
}

impl DisplaySink for CvDisplay {
    type Image = Mat;

    fn render(&mut self, msg: &DetectMsg<Mat>) -> Result<()> {
        let mut frame = msg.image.clone();

        // Blur runs strictly before box drawing so the outlines stay crisp.
        if self.blur_detections {
            overlay::blur_regions(&mut frame, &msg.detections)?;
        }
        overlay::draw_boxes(&mut frame, &msg.detections)?;

        let clock = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        overlay::draw_clock(&mut frame, &clock)?;

        highgui::imshow(WINDOW_TITLE, &frame)?;

        Ok(())
    }

    fn poll_quit(&mut self) -> Result<bool> {
        Ok(highgui::wait_key(1)? == QUIT_KEY as i32)
    }
}

impl Drop for CvDisplay {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            warn!(target: "presenter", "failed to destroy window: {}", e);
        }
    }
}
