use std::time::{
    Duration,
    Instant,
};

use prometheus::Histogram;

use crate::log_distribution;

/// Observes the elapsed seconds into a histogram when dropped. Nothing is
/// recorded if the thread is panicking, so unit-test failures don't pollute
/// duration metrics.
pub struct Timer {
    start: Instant,
    histogram: &'static Histogram,
}

impl Timer {
    pub fn new(histogram: &'static Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        log_distribution(self.histogram, self.start.elapsed().as_secs_f64());
    }
}
