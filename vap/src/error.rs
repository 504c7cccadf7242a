//! # Stage failure reporting

use anyhow::Error;
use core::fmt;

/// Pipeline stage names, used to tag failures and log records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Streamer,
    Detector,
    Presenter,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Streamer => "streamer",
            Self::Detector => "detector",
            Self::Presenter => "presenter",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An unexpected failure caught at a stage's loop boundary.
///
/// Failures never cross a channel. The owning stage logs the failure and
/// runs its cleanup path: sentinel emission, resource release, stop.
pub struct WorkerFailure {
    pub stage: Stage,
    pub cause: Error,
}

impl WorkerFailure {
    pub fn new(stage: Stage, cause: Error) -> Self {
        Self { stage, cause }
    }
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} failed: {:#}", self.stage, self.cause)
    }
}
