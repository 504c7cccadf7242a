//! Frame overlay drawing

use opencv::core::{self, Mat, Point, Rect, Scalar, Size};
use opencv::imgproc;
use opencv::prelude::*;
use vap::prelude::v1::*;

/// Side length of the Gaussian kernel used for detection-region blurring.
pub const BLUR_KERNEL: i32 = 21;
/// Outline thickness of detection boxes.
pub const BOX_THICKNESS: i32 = 2;
/// Anchor of the clock overlay.
pub const CLOCK_ANCHOR: (i32, i32) = (10, 30);

fn overlay_color() -> Scalar {
    // BGR green.
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

/// Blur every detection region of `image` in place.
///
/// Rectangles are clamped to the image bounds first and anything without
/// positive area after clamping is skipped, so pixels outside the clamped
/// rectangles are never touched.
pub fn blur_regions(image: &mut Mat, detections: &[BoundingBox]) -> Result<()> {
    let bounds = (image.cols(), image.rows());

    for b in detections {
        if let Some(b) = b.clamped(bounds) {
            let mut region = Mat::roi(image, Rect::new(b.x, b.y, b.width, b.height))?;

            let mut blurred = Mat::default();
            imgproc::gaussian_blur(
                &region,
                &mut blurred,
                Size::new(BLUR_KERNEL, BLUR_KERNEL),
                0.0,
                0.0,
                core::BORDER_DEFAULT,
            )?;

            blurred.copy_to(&mut region)?;
        }
    }

    Ok(())
}

/// Draw an unfilled outline for every detection.
///
/// Boxes are drawn as given, without clamping.
pub fn draw_boxes(image: &mut Mat, detections: &[BoundingBox]) -> Result<()> {
    for b in detections {
        imgproc::rectangle(
            image,
            Rect::new(b.x, b.y, b.width, b.height),
            overlay_color(),
            BOX_THICKNESS,
            imgproc::LINE_8,
            0,
        )?;
    }

    Ok(())
}

/// Overlay `text` at the fixed clock anchor.
pub fn draw_clock(image: &mut Mat, text: &str) -> Result<()> {
    imgproc::put_text(
        image,
        text,
        Point::new(CLOCK_ANCHOR.0, CLOCK_ANCHOR.1),
        imgproc::FONT_HERSHEY_SIMPLEX,
        0.7,
        overlay_color(),
        2,
        imgproc::LINE_8,
        false,
    )?;

    Ok(())
}
