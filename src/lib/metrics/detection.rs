//! Metrics for the `call` command.

use serde::{Deserialize, Serialize};

use super::Metric;
use crate::cluster::ClusterStats;
use crate::resolver::ResolverStats;

/// Counts describing one detection run.
///
/// Pair counts follow the classifier's categories; the candidate counts are the
/// variations each evidence source produced before resolution and clustering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionMetrics {
    /// Read pairs (or unpaired reads) examined.
    pub pairs: u64,
    pub normal_pairs: u64,
    pub single_reads: u64,
    /// Pairs with one soft-clipped read.
    pub split_pairs: u64,
    pub filtered_pairs: u64,
    /// Split pairs whose split read did not yield two usable parts.
    pub unusable_splits: u64,
    /// Reads whose MD tag did not match their CIGAR.
    pub malformed_edit_tags: u64,
    pub edit_tag_variations: u64,
    pub pair_variations: u64,
    pub split_variations: u64,
    /// Hypothesis groups stored for resolution.
    pub hypothesis_groups: u64,
    /// Hypothesis groups absorbed into an earlier group.
    pub absorbed_groups: u64,
    /// Unambiguous variations that voted for a group member.
    pub absorbed_variations: u64,
    pub groups_with_winner: u64,
    /// Winners decided by local coverage.
    pub coverage_tie_breaks: u64,
    pub groups_without_winner: u64,
    pub snp_records: u64,
    pub structural_records: u64,
    /// Lower bound of the insert-size window used.
    pub min_insert_size: i64,
    /// Upper bound of the insert-size window used.
    pub max_insert_size: i64,
}

impl Metric for DetectionMetrics {
    fn metric_name() -> &'static str {
        "detection"
    }
}

impl DetectionMetrics {
    /// Folds in the resolver's counts.
    pub fn record_resolution(&mut self, stats: ResolverStats) {
        self.hypothesis_groups = stats.groups;
        self.absorbed_groups = stats.absorbed_groups;
        self.absorbed_variations = stats.absorbed_pool;
        self.groups_with_winner = stats.winners;
        self.coverage_tie_breaks = stats.tie_breaks;
        self.groups_without_winner = stats.unresolved;
    }

    /// Folds in the row counts of the clustering engine.
    pub fn record_output(&mut self, stats: ClusterStats) {
        self.snp_records = stats.snp_records;
        self.structural_records = stats.structural_records;
    }
}
