//! Frame-differencing motion detector
//!
//! Detects motion by comparing each frame's intensity against the previous
//! frame's intensity, thresholding the difference and extracting connected
//! regions above a minimum area. The detector keeps exactly one frame of
//! grayscale history and is fully deterministic.

use log::*;
use opencv::core::{self, Mat, Point};
use opencv::imgproc;
use opencv::types::VectorOfVectorOfPoint;
use vap::prelude::v1::*;

/// Intensity difference above which a pixel counts as changed.
pub const DIFF_THRESHOLD: f64 = 25.0;
/// Dilation passes applied to the binary motion mask to merge fragmented
/// blobs.
pub const DILATE_ITERATIONS: i32 = 2;
/// Contours with a smaller area are rejected as sensor noise.
pub const MIN_CONTOUR_AREA: f64 = 500.0;

/// Motion detector with one frame of grayscale history.
///
/// The first frame establishes the motion baseline and always yields an
/// empty detection list.
#[derive(Default)]
pub struct DiffMotionDetector {
    prev_gray: Option<Mat>,
}

impl DiffMotionDetector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MotionDetector for DiffMotionDetector {
    type Image = Mat;

    fn detect(&mut self, frame: &Mat) -> Result<Vec<BoundingBox>> {
        let mut gray = Mat::default();
        imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?;

        let detections = match &self.prev_gray {
            None => vec![],
            Some(prev) => {
                let mut diff = Mat::default();
                core::absdiff(&gray, prev, &mut diff)?;

                let mut mask = Mat::default();
                imgproc::threshold(
                    &diff,
                    &mut mask,
                    DIFF_THRESHOLD,
                    255.0,
                    imgproc::THRESH_BINARY,
                )?;

                // Default 3x3 structuring element.
                let mut dilated = Mat::default();
                imgproc::dilate(
                    &mask,
                    &mut dilated,
                    &Mat::default(),
                    Point::new(-1, -1),
                    DILATE_ITERATIONS,
                    core::BORDER_CONSTANT,
                    imgproc::morphology_default_border_value()?,
                )?;

                let mut contours = VectorOfVectorOfPoint::new();
                imgproc::find_contours(
                    &dilated,
                    &mut contours,
                    imgproc::RETR_EXTERNAL,
                    imgproc::CHAIN_APPROX_SIMPLE,
                    Point::default(),
                )?;

                let mut detections = vec![];
                for contour in contours.iter() {
                    if imgproc::contour_area(&contour, false)? < MIN_CONTOUR_AREA {
                        continue;
                    }

                    let rect = imgproc::bounding_rect(&contour)?;
                    detections.push(BoundingBox::new(rect.x, rect.y, rect.width, rect.height));
                }

                detections
            }
        };

        if !detections.is_empty() {
            debug!(target: "detector", "{} motion regions", detections.len());
        }

        self.prev_gray = Some(gray);

        Ok(detections)
    }
}
