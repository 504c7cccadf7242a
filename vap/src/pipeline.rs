//! # Pipeline wiring and stage loops
//!
//! Three workers run on their own OS threads: the streamer paces frames out
//! of a [`FrameSource`], the detector folds them through a
//! [`MotionDetector`], and the presenter renders [`DetectMsg`]s into a
//! [`DisplaySink`]. Data flows strictly streamer → detector → presenter over
//! two bounded packet channels; control flows through the shared
//! [`CancelToken`] and the end-of-stream sentinel each worker forwards
//! exactly once before exiting, so downstream workers terminate even when an
//! upstream worker fails.
//!
//! A worker blocked on a full channel cannot stall forever: when its
//! consumer exits, the receiving half is dropped and the blocked send
//! returns a disconnect error, which senders treat as a stop signal.

use crate::prelude::v1::*;
use log::{error, info};
use std::thread::{Builder, JoinHandle};
use std::time::Instant;

/// Capacity of both inter-stage channels.
pub const CHANNEL_CAPACITY: usize = 4;
/// Frame rate assumed when the source does not report a usable one.
pub const FALLBACK_RATE: f64 = 30.0;
/// Upper bound on the presenter's display rate.
pub const DISPLAY_RATE: f64 = 30.0;

/// Owner of the three stage threads.
pub struct Pipeline {
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawn the streamer, detector and presenter threads, wired by two
    /// bounded channels.
    ///
    /// # Arguments
    ///
    /// * `open_source` - runs on the streamer thread to open the video
    ///   source; an open failure still produces a sentinel downstream.
    /// * `detector` - motion detector, moved onto the detector thread.
    /// * `open_sink` - runs on the presenter thread to create the display
    ///   sink.
    /// * `cancel` - shared cancellation token observed by every stage.
    pub fn spawn<S, D, P, FS, FP>(
        open_source: FS,
        detector: D,
        open_sink: FP,
        cancel: CancelToken,
    ) -> Result<Self>
    where
        S: FrameSource + 'static,
        S::Image: Send + 'static,
        D: MotionDetector<Image = S::Image> + Send + 'static,
        P: DisplaySink<Image = S::Image> + 'static,
        FS: FnOnce() -> Result<S> + Send + 'static,
        FP: FnOnce() -> Result<P> + Send + 'static,
    {
        let (frames_tx, frames_rx) = bounded(CHANNEL_CAPACITY);
        let (results_tx, results_rx) = bounded(CHANNEL_CAPACITY);

        let streamer = {
            let cancel = cancel.clone();
            Builder::new()
                .name("streamer".into())
                .spawn(move || run_streamer(open_source, frames_tx, &cancel))?
        };

        let detector = {
            let cancel = cancel.clone();
            Builder::new()
                .name("detector".into())
                .spawn(move || run_detector(detector, frames_rx, results_tx, &cancel))?
        };

        let presenter = Builder::new()
            .name("presenter".into())
            .spawn(move || run_presenter(open_sink, results_rx, &cancel))?;

        Ok(Self {
            handles: vec![streamer, detector, presenter],
        })
    }

    /// Wait for all stages to exit.
    ///
    /// A panicked stage is logged rather than propagated; the remaining
    /// stages are still joined.
    pub fn join(self) {
        for handle in self.handles {
            let name = handle.thread().name().unwrap_or("stage").to_string();
            if handle.join().is_err() {
                error!("{} thread panicked", name);
            }
        }
    }
}

fn run_streamer<S, FS>(
    open_source: FS,
    frames_tx: PacketSender<FrameMsg<S::Image>>,
    cancel: &CancelToken,
) where
    S: FrameSource,
    FS: FnOnce() -> Result<S>,
{
    info!(target: "streamer", "starting");

    let mut source = match open_source() {
        Ok(source) => source,
        Err(e) => {
            error!(target: "streamer", "{}", WorkerFailure::new(Stage::Streamer, e));
            frames_tx.finish();
            return;
        }
    };

    let rate = source
        .frame_rate()
        .filter(|rate| *rate > 0.0)
        .unwrap_or(FALLBACK_RATE);
    let mut pacer = Pacer::from_rate(rate);
    let start = Instant::now();
    let mut frame_id = 0u64;

    let result = loop {
        if cancel.is_cancelled() {
            break Ok(());
        }

        match source.read_frame() {
            Ok(Some(image)) => {
                let msg = FrameMsg {
                    frame_id,
                    timestamp: start.elapsed().as_secs_f64(),
                    image,
                };
                // Backpressure point: blocks while the channel is full.
                if frames_tx.send(msg).is_err() {
                    break Ok(());
                }
                frame_id += 1;
                pacer.wait();
            }
            Ok(None) => {
                info!(target: "streamer", "end of video stream");
                break Ok(());
            }
            Err(e) => break Err(e),
        }
    };

    if let Err(e) = result {
        error!(target: "streamer", "{}", WorkerFailure::new(Stage::Streamer, e));
    }

    // Cleanup runs on every path: the source handle is released by drop and
    // exactly one sentinel goes downstream.
    drop(source);
    frames_tx.finish();
    info!(target: "streamer", "finished");
}

fn run_detector<D>(
    mut detector: D,
    frames_rx: PacketReceiver<FrameMsg<D::Image>>,
    results_tx: PacketSender<DetectMsg<D::Image>>,
    cancel: &CancelToken,
) where
    D: MotionDetector,
{
    info!(target: "detector", "starting");

    let result = loop {
        if cancel.is_cancelled() {
            break Ok(());
        }

        let frame = match frames_rx.recv() {
            Ok(Packet::Data(frame)) => frame,
            // Sentinel, or the streamer hung up without one.
            Ok(Packet::EndOfStream) | Err(_) => break Ok(()),
        };

        // Shutdown ordering wins over processing a frame that was already
        // pulled off the channel.
        if cancel.is_cancelled() {
            break Ok(());
        }

        match detector.detect(&frame.image) {
            Ok(detections) => {
                let msg = DetectMsg {
                    frame_id: frame.frame_id,
                    timestamp: frame.timestamp,
                    image: frame.image,
                    detections,
                };
                if results_tx.send(msg).is_err() {
                    break Ok(());
                }
            }
            // Fail-stop: the differencing history cannot be resumed safely.
            Err(e) => break Err(e),
        }
    };

    if let Err(e) = result {
        error!(target: "detector", "{}", WorkerFailure::new(Stage::Detector, e));
    }

    results_tx.finish();
    info!(target: "detector", "finished");
}

fn run_presenter<P, FP>(
    open_sink: FP,
    results_rx: PacketReceiver<DetectMsg<P::Image>>,
    cancel: &CancelToken,
) where
    P: DisplaySink,
    FP: FnOnce() -> Result<P>,
{
    info!(target: "presenter", "starting");

    let mut sink = match open_sink() {
        Ok(sink) => sink,
        Err(e) => {
            error!(target: "presenter", "{}", WorkerFailure::new(Stage::Presenter, e));
            return;
        }
    };

    let mut pacer = Pacer::from_rate(DISPLAY_RATE);

    let result = loop {
        if cancel.is_cancelled() {
            break Ok(());
        }

        let msg = match results_rx.recv() {
            Ok(Packet::Data(msg)) => msg,
            Ok(Packet::EndOfStream) | Err(_) => break Ok(()),
        };

        if let Err(e) = sink.render(&msg) {
            break Err(e);
        }

        pacer.wait();

        match sink.poll_quit() {
            Ok(true) => {
                info!(target: "presenter", "quit requested");
                cancel.cancel();
                break Ok(());
            }
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    if let Err(e) = result {
        error!(target: "presenter", "{}", WorkerFailure::new(Stage::Presenter, e));
    }

    // The window is destroyed by the sink's drop on every path.
    info!(target: "presenter", "finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Yields the images `0..count`, ticking fast enough for tests.
    struct CountingSource {
        next: u64,
        count: u64,
        fail_at: Option<u64>,
    }

    impl CountingSource {
        fn new(count: u64) -> Self {
            Self {
                next: 0,
                count,
                fail_at: None,
            }
        }
    }

    impl FrameSource for CountingSource {
        type Image = u64;

        fn read_frame(&mut self) -> Result<Option<u64>> {
            if self.fail_at == Some(self.next) {
                return Err(anyhow!("read failure"));
            }
            if self.next >= self.count {
                return Ok(None);
            }
            let image = self.next;
            self.next += 1;
            Ok(Some(image))
        }

        fn frame_rate(&self) -> Option<f64> {
            Some(10_000.0)
        }
    }

    /// Boxes every even image, fails at a configurable image.
    struct StubDetector {
        fail_at: Option<u64>,
    }

    impl MotionDetector for StubDetector {
        type Image = u64;

        fn detect(&mut self, frame: &u64) -> Result<Vec<BoundingBox>> {
            if self.fail_at == Some(*frame) {
                return Err(anyhow!("detect failure"));
            }
            if frame % 2 == 0 {
                Ok(vec![BoundingBox::new(0, 0, 40, 40)])
            } else {
                Ok(vec![])
            }
        }
    }

    /// Records rendered frame ids; optionally quits after a fixed count.
    struct RecordingSink {
        rendered: Arc<Mutex<Vec<u64>>>,
        quit_after: Option<usize>,
    }

    impl DisplaySink for RecordingSink {
        type Image = u64;

        fn render(&mut self, msg: &DetectMsg<u64>) -> Result<()> {
            self.rendered.lock().unwrap().push(msg.frame_id);
            Ok(())
        }

        fn poll_quit(&mut self) -> Result<bool> {
            Ok(match self.quit_after {
                Some(n) => self.rendered.lock().unwrap().len() >= n,
                None => false,
            })
        }
    }

    fn drain(rx: &PacketReceiver<DetectMsg<u64>>) -> (Vec<u64>, bool) {
        let mut ids = vec![];
        let mut saw_sentinel = false;
        while let Ok(packet) = rx.recv() {
            match packet {
                Packet::Data(msg) => {
                    assert!(!saw_sentinel, "data after sentinel");
                    ids.push(msg.frame_id);
                }
                Packet::EndOfStream => saw_sentinel = true,
            }
        }
        (ids, saw_sentinel)
    }

    #[test]
    fn frames_flow_through_in_order() {
        let rendered = Arc::new(Mutex::new(vec![]));
        let cancel = CancelToken::new();

        let pipeline = Pipeline::spawn(
            || Ok(CountingSource::new(5)),
            StubDetector { fail_at: None },
            {
                let rendered = rendered.clone();
                move || {
                    Ok(RecordingSink {
                        rendered,
                        quit_after: None,
                    })
                }
            },
            cancel.clone(),
        )
        .unwrap();

        pipeline.join();

        assert_eq!(*rendered.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(!cancel.is_cancelled());
    }

    #[test]
    fn open_failure_emits_only_a_sentinel() {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let cancel = CancelToken::new();

        run_streamer(
            || Err::<CountingSource, _>(anyhow!("no such file")),
            tx,
            &cancel,
        );

        assert!(matches!(rx.recv().unwrap(), Packet::EndOfStream));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn streamer_stops_on_cancel_without_reading() {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let cancel = CancelToken::new();
        cancel.cancel();

        run_streamer(|| Ok(CountingSource::new(100)), tx, &cancel);

        assert!(matches!(rx.recv().unwrap(), Packet::EndOfStream));
    }

    #[test]
    fn streamer_read_failure_still_emits_one_sentinel() {
        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let cancel = CancelToken::new();

        let mut source = CountingSource::new(100);
        source.fail_at = Some(2);
        run_streamer(move || Ok(source), tx, &cancel);

        assert!(matches!(rx.recv().unwrap(), Packet::Data(FrameMsg { frame_id: 0, .. })));
        assert!(matches!(rx.recv().unwrap(), Packet::Data(FrameMsg { frame_id: 1, .. })));
        assert!(matches!(rx.recv().unwrap(), Packet::EndOfStream));
        assert!(rx.recv().is_err());
    }

    #[test]
    fn streamer_timestamps_never_decrease() {
        let (tx, rx) = bounded(100);
        let cancel = CancelToken::new();

        run_streamer(|| Ok(CountingSource::new(5)), tx, &cancel);

        let mut last = 0.0;
        while let Ok(Packet::Data(msg)) = rx.recv() {
            assert!(msg.timestamp >= last);
            last = msg.timestamp;
        }
    }

    #[test]
    fn detector_forwards_frames_then_sentinel() {
        let (frames_tx, frames_rx) = bounded(CHANNEL_CAPACITY);
        let (results_tx, results_rx) = bounded(100);
        let cancel = CancelToken::new();

        for frame_id in 0..3 {
            frames_tx
                .send(FrameMsg {
                    frame_id,
                    timestamp: frame_id as f64,
                    image: frame_id,
                })
                .unwrap();
        }
        frames_tx.finish();

        run_detector(StubDetector { fail_at: None }, frames_rx, results_tx, &cancel);

        let (ids, saw_sentinel) = drain(&results_rx);
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(saw_sentinel);
    }

    #[test]
    fn detector_fails_stop_after_error() {
        let (frames_tx, frames_rx) = bounded(CHANNEL_CAPACITY);
        let (results_tx, results_rx) = bounded(100);
        let cancel = CancelToken::new();

        for frame_id in 0..3 {
            frames_tx
                .send(FrameMsg {
                    frame_id,
                    timestamp: 0.0,
                    image: frame_id,
                })
                .unwrap();
        }
        frames_tx.finish();

        run_detector(
            StubDetector { fail_at: Some(1) },
            frames_rx,
            results_tx,
            &cancel,
        );

        let (ids, saw_sentinel) = drain(&results_rx);
        assert_eq!(ids, vec![0]);
        assert!(saw_sentinel);
    }

    #[test]
    fn detector_stops_immediately_on_cancel() {
        let (frames_tx, frames_rx) = bounded(CHANNEL_CAPACITY);
        let (results_tx, results_rx) = bounded(100);
        let cancel = CancelToken::new();

        frames_tx
            .send(FrameMsg {
                frame_id: 0,
                timestamp: 0.0,
                image: 0,
            })
            .unwrap();
        cancel.cancel();

        run_detector(StubDetector { fail_at: None }, frames_rx, results_tx, &cancel);

        let (ids, saw_sentinel) = drain(&results_rx);
        assert!(ids.is_empty());
        assert!(saw_sentinel);
    }

    #[test]
    fn presenter_quit_sets_the_token() {
        let (results_tx, results_rx) = bounded(CHANNEL_CAPACITY);
        let cancel = CancelToken::new();
        let rendered = Arc::new(Mutex::new(vec![]));

        for frame_id in 0..3 {
            results_tx
                .send(DetectMsg {
                    frame_id,
                    timestamp: 0.0,
                    image: frame_id,
                    detections: vec![],
                })
                .unwrap();
        }
        results_tx.finish();

        run_presenter(
            {
                let rendered = rendered.clone();
                move || {
                    Ok(RecordingSink {
                        rendered,
                        quit_after: Some(1),
                    })
                }
            },
            results_rx,
            &cancel,
        );

        assert!(cancel.is_cancelled());
        assert_eq!(*rendered.lock().unwrap(), vec![0]);
    }

    #[test]
    fn quit_drains_the_whole_pipeline() {
        let rendered = Arc::new(Mutex::new(vec![]));
        let cancel = CancelToken::new();

        let pipeline = Pipeline::spawn(
            || Ok(CountingSource::new(1_000)),
            StubDetector { fail_at: None },
            {
                let rendered = rendered.clone();
                move || {
                    Ok(RecordingSink {
                        rendered,
                        quit_after: Some(3),
                    })
                }
            },
            cancel.clone(),
        )
        .unwrap();

        pipeline.join();

        assert!(cancel.is_cancelled());
        assert_eq!(*rendered.lock().unwrap(), vec![0, 1, 2]);
    }
}
