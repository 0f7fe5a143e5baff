//! Single-pass estimation of the sample statistics.
//!
//! Both estimates use the same robust core: the values are sorted and only the middle
//! `max(min_core_count, n * core)` of them are kept. The bounds are then the mean of
//! the core plus and minus three standard deviations.

use super::{ExactCoverage, SampleSettings, SampleStatistics};
use crate::errors::GatacaError;
use crate::factory::InsertWindow;
use crate::pairs::{ClassifiedPair, PairKind};
use crate::reference::ReferenceReader;
use crate::sam::AlignedRead;
use ahash::AHashMap;
use anyhow::Result;
use log::{info, warn};
use statrs::statistics::{Data, Median, Statistics};

/// Bounds `(ceil(mean - 3sd), floor(mean + 3sd))` over the core of `values`, or `None`
/// when there are no values.
#[must_use]
pub fn core_bounds(values: &[f64], core: f64, min_core_count: usize) -> Option<(i64, i64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let core_count = min_core_count.max((n as f64 * core) as usize);
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let core_values = if n < core_count {
        &sorted[..]
    } else {
        let half = n / 2;
        let core_half = core_count.div_ceil(2);
        &sorted[half.saturating_sub(core_half)..(half + core_half).min(n)]
    };
    let mean = core_values.iter().mean();
    let three_sd = 3.0 * core_values.iter().population_std_dev();
    Some(((mean - three_sd).ceil() as i64, (mean + three_sd).floor() as i64))
}

fn median(values: Vec<f64>) -> f64 {
    Data::new(values).median()
}

/// Accumulates reads and pairs from one pass over the input.
#[derive(Debug)]
pub struct SampleEstimator<'a> {
    settings: SampleSettings,
    reference: &'a ReferenceReader,
    windows: Vec<AHashMap<i64, i64>>,
    insert_sizes: Vec<f64>,
    exact: ExactCoverage,
}

impl<'a> SampleEstimator<'a> {
    #[must_use]
    pub fn new(settings: SampleSettings, reference: &'a ReferenceReader) -> Self {
        Self {
            settings,
            reference,
            windows: Vec::new(),
            insert_sizes: Vec::new(),
            exact: ExactCoverage::default(),
        }
    }

    fn window_of(&self, pos: i64) -> i64 {
        let size = self.settings.window_size.max(1);
        pos.div_euclid(size) * size
    }

    fn count_window(&mut self, read: &AlignedRead) {
        let window = self.window_of(read.pos);
        if self.windows.len() <= read.reference {
            self.windows.resize_with(read.reference + 1, AHashMap::new);
        }
        *self.windows[read.reference].entry(window).or_insert(0) += 1;
    }

    /// Records one usable (mapped, non-duplicate, quality-passing) read in the exact
    /// coverage index.
    pub fn observe_read(&mut self, read: &AlignedRead) {
        self.exact.add(read.reference, read.pos, read.end);
    }

    /// Counts the reads of a classified pair into their windows and samples the insert
    /// size of normal pairs.
    pub fn observe(&mut self, pair: &ClassifiedPair) {
        if pair.kind == PairKind::Filtered {
            return;
        }
        self.count_window(&pair.read);
        if let Some(mate) = &pair.mate {
            self.count_window(mate);
        }
        if pair.kind == PairKind::Normal && self.insert_sizes.len() < self.settings.insert_reads {
            let size = pair.size();
            if size != 0 {
                self.insert_sizes.push(size as f64);
            }
        }
    }

    /// GC content of the window starting at `start`, as a whole percentage.
    fn gc_percent(&self, reference: usize, start: i64) -> u32 {
        let end = (start + self.settings.window_size).min(self.reference.reference_length(reference));
        let Ok(bases) = self.reference.fetch(reference, start, end) else { return 0 };
        if bases.is_empty() {
            return 0;
        }
        let gc = bases.iter().filter(|b| matches!(b.to_ascii_uppercase(), b'G' | b'C')).count();
        (gc as f64 / bases.len() as f64 * 100.0).round() as u32
    }

    /// Scales every window by `median(all) / median(windows with the same GC content)`.
    fn correct_gc(&mut self) {
        let all: Vec<f64> =
            self.windows.iter().flat_map(|w| w.values().map(|&c| c as f64)).collect();
        if all.is_empty() {
            return;
        }
        let overall = median(all);

        let mut by_gc: AHashMap<u32, Vec<(usize, i64)>> = AHashMap::new();
        for (reference, windows) in self.windows.iter().enumerate() {
            for &start in windows.keys() {
                by_gc.entry(self.gc_percent(reference, start)).or_default().push((reference, start));
            }
        }

        for members in by_gc.values() {
            let counts = members.iter().map(|&(r, s)| self.windows[r][&s] as f64).collect();
            let group = median(counts);
            if group <= 0.0 {
                continue;
            }
            let coefficient = overall / group;
            for &(reference, start) in members {
                if let Some(count) = self.windows[reference].get_mut(&start) {
                    *count = (*count as f64 * coefficient).round() as i64;
                }
            }
        }
    }

    /// Finishes the estimates. Bounds given in the settings take precedence.
    ///
    /// # Errors
    /// Returns an error when no insert-size window was given and no normal pair was seen
    /// to estimate one from.
    pub fn finish(mut self) -> Result<SampleStatistics> {
        self.correct_gc();
        let (core, min_core) = (self.settings.core, self.settings.min_core_count);

        let (min, max) = match self.settings.insert_size {
            Some(bounds) => bounds,
            None => core_bounds(&self.insert_sizes, core, min_core).ok_or_else(|| {
                GatacaError::InvalidParameter {
                    parameter: "insert-size".to_string(),
                    reason: "no normal pairs to estimate from; pass the window explicitly"
                        .to_string(),
                }
            })?,
        };
        info!("Insert size window: [{min}, {max}] from {} pairs", self.insert_sizes.len());

        let coverage_bounds = match self.settings.coverage {
            Some(bounds) => bounds,
            None => {
                let counts: Vec<f64> =
                    self.windows.iter().flat_map(|w| w.values().map(|&c| c as f64)).collect();
                core_bounds(&counts, core, min_core).unwrap_or_else(|| {
                    warn!("No coverage recorded; coverage tie-breaks are disabled");
                    (0, i64::MAX)
                })
            }
        };
        info!("Coverage bounds: [{}, {}]", coverage_bounds.0, coverage_bounds.1);

        Ok(SampleStatistics::new(InsertWindow::new(min, max), coverage_bounds)
            .with_windows(self.settings.window_size, self.windows)
            .with_exact_coverage(self.exact.finish()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairs::{ClassifierSettings, PairClassifier};
    use crate::sam::builder::PairBuilder;
    use rstest::rstest;

    fn aligned(record: &noodles::sam::alignment::RecordBuf) -> AlignedRead {
        AlignedRead::from_record(record).expect("decodes").expect("mapped")
    }

    #[rstest]
    #[case(vec![300.0; 20], Some((300, 300)))]
    #[case(vec![100.0, 200.0], Some((0, 300)))]
    #[case(Vec::new(), None)]
    fn test_core_bounds(#[case] values: Vec<f64>, #[case] expected: Option<(i64, i64)>) {
        assert_eq!(core_bounds(&values, 0.1, 10), expected);
    }

    #[test]
    fn test_core_drops_outliers() {
        let mut values: Vec<f64> = (0..100).map(|i| 290.0 + f64::from(i % 21)).collect();
        values.push(50_000.0);
        values.push(-50_000.0);
        let (min, max) = core_bounds(&values, 0.1, 10).expect("bounds");
        assert!(min > 250 && max < 350, "bounds were ({min}, {max})");
    }

    #[test]
    fn test_estimates_insert_window_and_coverage() -> Result<()> {
        let reference = ReferenceReader::from_sequences([("chr1", "ACGT".repeat(500))]);
        let classifier = PairClassifier::new(ClassifierSettings::default(), vec![2_000]);
        let mut estimator = SampleEstimator::new(SampleSettings::default(), &reference);
        for i in 0..12 {
            let (r1, r2) = PairBuilder::new(&format!("p{i}"))
                .r1(0, 101, "20M")
                .r2(0, 401, "20M")
                .build();
            let (read, mate) = (aligned(&r1), aligned(&r2));
            estimator.observe_read(&read);
            estimator.observe_read(&mate);
            estimator.observe(&classifier.classify(read, Some(mate)));
        }
        let stats = estimator.finish()?;
        assert_eq!(stats.insert_window(), InsertWindow::new(280, 280));
        assert!((stats.coverage(0, 100, 100) - 12.0).abs() < f64::EPSILON);
        assert_eq!(stats.coverage_bounds(), (12, 12));
        assert_eq!(stats.exact_coverage(0, 100, 100), 12);
        assert_eq!(stats.exact_coverage(0, 121, 399), 0);
        Ok(())
    }

    #[test]
    fn test_missing_insert_sizes_fail_unless_given() {
        let reference = ReferenceReader::from_sequences([("chr1", "ACGT".repeat(10))]);
        assert!(SampleEstimator::new(SampleSettings::default(), &reference).finish().is_err());

        let settings = SampleSettings { insert_size: Some((200, 400)), ..SampleSettings::default() };
        let stats = SampleEstimator::new(settings, &reference).finish().expect("given window");
        assert_eq!(stats.insert_window(), InsertWindow::new(200, 400));
        assert_eq!(stats.coverage_bounds(), (0, i64::MAX));
    }
}
