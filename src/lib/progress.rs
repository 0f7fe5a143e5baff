//! Progress tracking for the single-threaded detection loop.
//!
//! The tracker keeps a running count of processed items and logs a line each time the
//! count crosses a multiple of the configured interval.

use log::info;

/// Progress tracker that logs at regular intervals.
///
/// # Example
/// ```
/// use gataca_lib::progress::ProgressTracker;
///
/// let mut tracker = ProgressTracker::new("Processed pairs").with_interval(100);
/// for _ in 0..250 {
///     tracker.record(1); // logs at 100 and 200
/// }
/// tracker.log_final(); // logs "Processed pairs 250 (complete)"
/// assert_eq!(tracker.count(), 250);
/// ```
pub struct ProgressTracker {
    /// Progress is logged when the count crosses multiples of this.
    interval: u64,
    /// Message prefix for log output.
    message: String,
    /// Items processed so far.
    count: u64,
}

impl ProgressTracker {
    /// Create a tracker with a default interval of 100,000.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { interval: 100_000, message: message.into(), count: 0 }
    }

    /// Set the logging interval. An interval of zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Add to the count, logging once for every interval boundary crossed.
    ///
    /// Returns `true` when the new count lies exactly on a boundary.
    pub fn record(&mut self, additional: u64) -> bool {
        let prev = self.count;
        self.count += additional;

        for i in (prev / self.interval + 1)..=(self.count / self.interval) {
            info!("{} {}", self.message, i * self.interval);
        }

        self.count > 0 && self.count % self.interval == 0
    }

    /// Log the final count unless the last [`record`](Self::record) already did.
    pub fn log_final(&self) {
        if self.count > 0 && self.count % self.interval != 0 {
            info!("{} {} (complete)", self.message, self.count);
        }
    }

    /// Items processed so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}
