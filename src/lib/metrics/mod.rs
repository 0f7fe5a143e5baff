//! Metrics collection and reporting for gataca runs.
//!
//! - [`detection`] - Counts kept while calling variants
//! - [`writer`] - Metrics file I/O utilities
//!
//! # Traits
//!
//! - [`Metric`] - Core trait for serializable metrics

pub mod detection;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use detection::DetectionMetrics;
pub use writer::{write_metrics, write_metrics_auto};

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type, used in error messages.
    fn metric_name() -> &'static str;
}
