//! Live motion-detection viewer
//!
//! Streams a video file through the motion-detection pipeline and shows the
//! annotated frames in a window. Press `q` in the window, or send SIGINT, to
//! stop; the pipeline drains and the process exits 0 either way.

use clap::*;
use cv_display::CvDisplay;
use cv_source::CvSource;
use diff_motion_detector::DiffMotionDetector;
use log::*;
use vap::prelude::v1::{Result, *};

fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("vap-viewer")
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("video")
                .long("video")
                .takes_value(true)
                .required(true)
                .help("Path to video file"),
        )
        .arg(Arg::new("blur").long("blur").help("Blur detection regions"))
        .get_matches();

    let video = matches.value_of("video").unwrap().to_string();
    let blur = matches.occurrences_of("blur") > 0;

    info!("starting video analytics pipeline");
    info!("video: {}", video);

    let cancel = CancelToken::new();

    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
            warn!("failed to install interrupt handler: {}", e);
        }
    }

    let pipeline = Pipeline::spawn(
        move || CvSource::open(&video),
        DiffMotionDetector::new(),
        move || CvDisplay::create(blur),
        cancel,
    )?;

    pipeline.join();

    info!("pipeline finished");

    Ok(())
}
