//! Logging utilities for formatted output.
//!
//! Consistent, user-friendly helpers for counts, rates and durations, an operation
//! timer, and the end-of-run detection summary.

use itertools::Itertools;
use std::time::{Duration, Instant};

use crate::metrics::DetectionMetrics;

/// A count with thousands separators.
///
/// ```
/// use gataca_lib::logging::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string().into_bytes();
    digits.rchunks(3).rev().map(String::from_utf8_lossy).join(",")
}

/// A fraction as a percentage with `decimals` places.
#[must_use]
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.decimals$}%", value * 100.0)
}

/// A duration as its two most significant units, e.g. `45s`, `2m 15s` or `1h 30m`.
///
/// ```
/// use gataca_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, mins, secs) = (secs / 3600, secs % 3600 / 60, secs % 60);
    match (hours, mins, secs) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

/// Throughput of `count` items over `duration`, per second or, when slower, per minute.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_rate(count: u64, duration: Duration) -> String {
    let secs = duration.as_secs_f64().max(1e-3);
    let per_sec = count as f64 / secs;
    if per_sec >= 1.0 {
        format!("{} items/s", format_count(per_sec as u64))
    } else {
        format!("{:.1} items/min", per_sec * 60.0)
    }
}

/// Logs a formatted summary of a detection run.
///
/// Reports how the input pairs were classified, how much evidence each signal source
/// produced, how the hypothesis groups resolved and how many records were written.
#[allow(clippy::cast_precision_loss)]
pub fn log_detection_summary(metrics: &DetectionMetrics) {
    log::info!("Variant Detection Summary:");
    log::info!("  Pairs examined: {}", format_count(metrics.pairs));
    log::info!("    Normal: {}", format_count(metrics.normal_pairs));
    log::info!("    Single: {}", format_count(metrics.single_reads));
    log::info!("    Split: {}", format_count(metrics.split_pairs));
    log::info!("    Filtered: {}", format_count(metrics.filtered_pairs));

    if metrics.pairs > 0 {
        let used = (metrics.pairs - metrics.filtered_pairs) as f64 / metrics.pairs as f64;
        log::info!("  Usable fraction: {}", format_percent(used, 2));
    }

    log::info!("  Unusable split reads: {}", format_count(metrics.unusable_splits));
    log::info!("  Malformed MD tags: {}", format_count(metrics.malformed_edit_tags));
    log::info!(
        "  Candidates: {} edit-tag, {} read-pair, {} split-read",
        format_count(metrics.edit_tag_variations),
        format_count(metrics.pair_variations),
        format_count(metrics.split_variations)
    );
    log::info!(
        "  Hypothesis groups: {} ({} resolved, {} without a winner)",
        format_count(metrics.hypothesis_groups),
        format_count(metrics.groups_with_winner),
        format_count(metrics.groups_without_winner)
    );
    log::info!(
        "  Records written: {} SNP, {} structural",
        format_count(metrics.snp_records),
        format_count(metrics.structural_records)
    );
}

/// Timer for tracking and logging operation duration.
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Logs the completion with item count and rate.
    pub fn log_completion(&self, count: u64) {
        let duration = self.start_time.elapsed();
        log::info!(
            "{} completed: {} in {} ({})",
            self.operation,
            format_count(count),
            format_duration(duration),
            format_rate(count, duration)
        );
    }
}
