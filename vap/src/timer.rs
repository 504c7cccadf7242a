//! # Frame pacing

use std::time::{Duration, Instant};

/// Paces a loop to a fixed interval.
///
/// Tracks the last release time and sleeps only the remaining slice of the
/// interval; an iteration that already overran its interval is released
/// immediately, never "paid back" with a negative sleep. Shared by the
/// streamer (source rate) and the presenter (display rate cap).
pub struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    /// Create a pacer with a fixed interval between releases.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Create a pacer for a rate in events per second.
    ///
    /// # Arguments
    ///
    /// * `rate` - target rate, must be positive.
    pub fn from_rate(rate: f64) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / rate))
    }

    /// Sleep out the rest of the current interval and open the next one.
    ///
    /// The first call returns immediately.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            if let Some(remaining) = self.interval.checked_sub(last.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_wait_returns_immediately() {
        let mut pacer = Pacer::new(Duration::from_secs(60));
        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn enforces_interval_floor() {
        let interval = Duration::from_millis(40);
        let mut pacer = Pacer::new(interval);

        pacer.wait();
        let start = Instant::now();
        pacer.wait();

        assert!(start.elapsed() >= interval);
    }

    #[test]
    fn overrun_iterations_are_released_immediately() {
        let mut pacer = Pacer::new(Duration::from_millis(10));

        pacer.wait();
        std::thread::sleep(Duration::from_millis(30));

        let start = Instant::now();
        pacer.wait();
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
