//! Per-sample statistics: the insert-size window and coverage.
//!
//! [`SampleStatistics`] is computed once by the [`SampleEstimator`] before detection starts
//! and is read-only afterwards. It answers two kinds of coverage questions:
//!
//! - [`coverage`](SampleStatistics::coverage) is the GC-corrected read count per window,
//!   averaged over the windows an interval touches. It is cheap and coarse.
//! - [`exact_coverage`](SampleStatistics::exact_coverage) counts the reads overlapping an
//!   interval, using a sorted index of every usable read span.

pub mod estimator;

pub use estimator::SampleEstimator;

use crate::factory::InsertWindow;
use ahash::AHashMap;

/// Knobs of the statistics pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSettings {
    /// Width of a coverage window.
    pub window_size: i64,
    /// Maximum number of normal pairs sampled for the insert-size estimate.
    pub insert_reads: usize,
    /// Fraction of the sorted values kept as the core of an estimate.
    pub core: f64,
    /// Minimum number of values in a core.
    pub min_core_count: usize,
    /// Insert-size window given up front; skips the estimate.
    pub insert_size: Option<(i64, i64)>,
    /// Coverage bounds given up front; skips the estimate.
    pub coverage: Option<(i64, i64)>,
}

impl Default for SampleSettings {
    fn default() -> Self {
        Self {
            window_size: 100,
            insert_reads: 10_000,
            core: 0.1,
            min_core_count: 10,
            insert_size: None,
            coverage: None,
        }
    }
}

/// Sorted read spans of one reference.
#[derive(Debug, Clone, Default)]
struct ReadSpans {
    /// First aligned positions, sorted.
    starts: Vec<i64>,
    /// Last aligned positions, sorted.
    lasts: Vec<i64>,
}

impl ReadSpans {
    /// Reads sharing at least one base with `[start, last]`.
    fn overlapping(&self, start: i64, last: i64) -> usize {
        let begun = self.starts.partition_point(|&s| s <= last);
        let finished = self.lasts.partition_point(|&l| l < start);
        begun - finished
    }
}

/// Index of usable read spans per reference, for exact coverage queries.
#[derive(Debug, Clone, Default)]
pub struct ExactCoverage {
    spans: Vec<ReadSpans>,
}

impl ExactCoverage {
    /// Records a read aligned over `[pos, end)`.
    pub fn add(&mut self, reference: usize, pos: i64, end: i64) {
        if self.spans.len() <= reference {
            self.spans.resize_with(reference + 1, ReadSpans::default);
        }
        let spans = &mut self.spans[reference];
        spans.starts.push(pos);
        spans.lasts.push(end - 1);
    }

    /// Sorts the index; must be called before querying.
    #[must_use]
    pub fn finish(mut self) -> Self {
        for spans in &mut self.spans {
            spans.starts.sort_unstable();
            spans.lasts.sort_unstable();
        }
        self
    }

    /// Reads overlapping the inclusive interval `[start, last]`.
    #[must_use]
    pub fn count(&self, reference: usize, start: i64, last: i64) -> usize {
        self.spans.get(reference).map_or(0, |s| s.overlapping(start, last.max(start)))
    }
}

/// Insert-size window and coverage of one sample.
#[derive(Debug, Clone)]
pub struct SampleStatistics {
    insert_window: InsertWindow,
    coverage_bounds: (i64, i64),
    window_size: i64,
    /// Corrected read count per window start, per reference.
    windows: Vec<AHashMap<i64, i64>>,
    exact: ExactCoverage,
}

impl SampleStatistics {
    /// Statistics with the given bounds and no recorded coverage.
    #[must_use]
    pub fn new(insert_window: InsertWindow, coverage_bounds: (i64, i64)) -> Self {
        Self {
            insert_window,
            coverage_bounds,
            window_size: SampleSettings::default().window_size,
            windows: Vec::new(),
            exact: ExactCoverage::default(),
        }
    }

    /// Replaces the windowed coverage.
    #[must_use]
    pub fn with_windows(mut self, window_size: i64, windows: Vec<AHashMap<i64, i64>>) -> Self {
        self.window_size = window_size.max(1);
        self.windows = windows;
        self
    }

    /// Replaces the exact-coverage index.
    #[must_use]
    pub fn with_exact_coverage(mut self, exact: ExactCoverage) -> Self {
        self.exact = exact;
        self
    }

    #[must_use]
    pub fn insert_window(&self) -> InsertWindow {
        self.insert_window
    }

    #[must_use]
    pub fn min_insert_size(&self) -> i64 {
        self.insert_window.min
    }

    #[must_use]
    pub fn max_insert_size(&self) -> i64 {
        self.insert_window.max
    }

    /// Expected coverage range `(min, max)` of a window.
    #[must_use]
    pub fn coverage_bounds(&self) -> (i64, i64) {
        self.coverage_bounds
    }

    /// Start of the window holding `pos`.
    #[must_use]
    pub fn window_of(&self, pos: i64) -> i64 {
        pos.div_euclid(self.window_size) * self.window_size
    }

    /// Mean corrected window count over the windows touched by `[start, end]`.
    #[must_use]
    pub fn coverage(&self, reference: usize, start: i64, end: i64) -> f64 {
        let Some(windows) = self.windows.get(reference) else { return 0.0 };
        let first = self.window_of(start.min(end));
        let last = self.window_of(start.max(end));
        let mut total = 0;
        let mut count = 0;
        let mut window = first;
        while window <= last {
            total += windows.get(&window).copied().unwrap_or(0);
            count += 1;
            window += self.window_size;
        }
        if count == 0 { 0.0 } else { total as f64 / f64::from(count) }
    }

    /// Reads overlapping `[start, end]` (0-based, inclusive).
    #[must_use]
    pub fn exact_coverage(&self, reference: usize, start: i64, end: i64) -> usize {
        self.exact.count(reference, start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact() -> ExactCoverage {
        let mut exact = ExactCoverage::default();
        exact.add(0, 100, 150);
        exact.add(0, 120, 170);
        exact.add(0, 300, 350);
        exact.add(2, 0, 10);
        exact.finish()
    }

    #[test]
    fn test_exact_coverage() {
        let exact = exact();
        assert_eq!(exact.count(0, 0, 99), 0);
        assert_eq!(exact.count(0, 0, 100), 1);
        assert_eq!(exact.count(0, 149, 149), 2);
        assert_eq!(exact.count(0, 150, 299), 1);
        assert_eq!(exact.count(0, 0, 1_000), 3);
        assert_eq!(exact.count(1, 0, 1_000), 0);
        assert_eq!(exact.count(2, 9, 9), 1);
        assert_eq!(exact.count(7, 0, 10), 0);
    }

    #[test]
    fn test_windowed_coverage_averages_touched_windows() {
        let mut windows = vec![AHashMap::new()];
        windows[0].insert(0, 10);
        windows[0].insert(100, 30);
        let stats = SampleStatistics::new(InsertWindow::new(200, 400), (5, 50))
            .with_windows(100, windows);
        assert!((stats.coverage(0, 10, 50) - 10.0).abs() < f64::EPSILON);
        assert!((stats.coverage(0, 50, 150) - 20.0).abs() < f64::EPSILON);
        assert!((stats.coverage(0, 150, 250) - 15.0).abs() < f64::EPSILON);
        assert!(stats.coverage(3, 0, 10).abs() < f64::EPSILON);
        assert_eq!(stats.window_of(199), 100);
        assert_eq!(stats.coverage_bounds(), (5, 50));
        assert_eq!(stats.max_insert_size(), 400);
    }
}
