//! # Video Analytics Pipeline Library
//!
//! This library provides the framework for staged video-analytics pipelines.
//! A pipeline is three workers wired by bounded packet channels: a streamer
//! paces frames out of a [`FrameSource`](source::FrameSource), a detector
//! turns frames into motion detections, and a presenter renders them into a
//! [`DisplaySink`](display::DisplaySink). Shutdown is cooperative: every
//! worker observes a shared [`CancelToken`](cancel::CancelToken) at loop
//! boundaries and forwards an end-of-stream sentinel exactly once before
//! exiting.
//!
//! The easiest way to use the library is to import its prelude:
//!
//! ```
//! use vap::prelude::v1::*;
//! ```

pub mod cancel;
pub mod channel;
pub mod detect;
pub mod display;
pub mod error;
pub mod message;
pub mod pipeline;
pub mod source;
pub mod timer;

pub mod prelude {
    pub mod v1 {
        pub use crate::{
            cancel::CancelToken,
            channel::{bounded, Packet, PacketReceiver, PacketSender},
            detect::MotionDetector,
            display::DisplaySink,
            error::{Stage, WorkerFailure},
            message::{BoundingBox, DetectMsg, FrameMsg},
            pipeline::Pipeline,
            source::FrameSource,
            timer::Pacer,
        };
        pub use anyhow::{anyhow, Error, Result};
    }
}
