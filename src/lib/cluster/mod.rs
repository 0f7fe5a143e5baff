//! Consensus clustering of the final candidate pool.
//!
//! Each reference keeps two indexes. SNPs are bucketed by their start position, and all
//! alleles at one position form one cluster. Structural variations are indexed by the
//! maximal span of their cluster's consensus. A new variation joins the first overlapping
//! cluster that accepts it; the cluster is then re-keyed under its narrowed span. A
//! variation that no cluster accepts seeds a new one.
//!
//! Clusters are emitted as VCF rows, per reference and sorted by start.

pub mod snp;
pub mod structural;

pub use snp::{Allele, SnpCluster};
pub use structural::StructuralCluster;

use crate::interval_index::IntervalIndex;
use crate::reference::ReferenceReader;
use crate::region::Region;
use crate::sample::SampleStatistics;
use crate::variation::{Variation, VariationKind};
use std::collections::BTreeMap;

/// `min(1, depth / fulldepth)` rounded to three decimals, or 1 without coverage.
#[must_use]
pub fn confidence(depth: u32, fulldepth: usize) -> f64 {
    if fulldepth == 0 {
        return 1.0;
    }
    let conf = (f64::from(depth) / fulldepth as f64).min(1.0);
    (conf * 1000.0).round() / 1000.0
}

/// A confidence without trailing zeros.
fn format_confidence(conf: f64) -> String {
    let text = format!("{conf:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Counts of the rows produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterStats {
    pub snp_clusters: u64,
    pub structural_clusters: u64,
    pub snp_records: u64,
    pub structural_records: u64,
}

/// Clusters of one reference.
#[derive(Debug, Default)]
struct ReferenceClusters {
    snps: BTreeMap<i64, SnpCluster>,
    structural: Vec<StructuralCluster>,
    index: IntervalIndex<usize>,
}

impl ReferenceClusters {
    fn add(&mut self, v: Variation) {
        if v.kind == VariationKind::Snp {
            match self.snps.get_mut(&v.start) {
                Some(cluster) => {
                    cluster.add(&v);
                }
                None => {
                    self.snps.insert(v.start, SnpCluster::new(&v));
                }
            }
            return;
        }

        let keys = self.index.overlapping_keys(v.max_start() - 1, v.max_end() + 1);
        for key in keys {
            for id in self.index.get(key).to_vec() {
                if self.structural[id].add(&v) {
                    let (start, end) = self.structural[id].span();
                    if (start, end) != key {
                        self.index.remove_where(key, |&entry| entry == id);
                        self.index.insert(start, end, id);
                    }
                    return;
                }
            }
        }

        let cluster = StructuralCluster::new(v);
        let (start, end) = cluster.span();
        self.index.insert(start, end, self.structural.len());
        self.structural.push(cluster);
    }
}

/// Emission knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterSettings {
    /// SNP alleles below this confidence are not reported.
    pub min_confidence: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self { min_confidence: 0.0 }
    }
}

/// Builds clusters from a pool of candidates and formats them.
#[derive(Debug, Default)]
pub struct ClusterEngine {
    settings: ClusterSettings,
    references: Vec<ReferenceClusters>,
}

impl ClusterEngine {
    #[must_use]
    pub fn new(settings: ClusterSettings) -> Self {
        Self { settings, references: Vec::new() }
    }

    /// Clusters `pool`, reference by reference and in order of start.
    pub fn cluster(&mut self, mut pool: Vec<Variation>) {
        pool.sort_by_key(|v| (v.reference, v.start));
        for v in pool {
            if self.references.len() <= v.reference {
                self.references.resize_with(v.reference + 1, ReferenceClusters::default);
            }
            self.references[v.reference].add(v);
        }
    }

    /// SNP clusters of `reference`, by position.
    pub fn snp_clusters(&self, reference: usize) -> impl Iterator<Item = &SnpCluster> {
        self.references.get(reference).into_iter().flat_map(|r| r.snps.values())
    }

    /// Structural clusters of `reference`, in creation order.
    #[must_use]
    pub fn structural_clusters(&self, reference: usize) -> &[StructuralCluster] {
        self.references.get(reference).map_or(&[], |r| r.structural.as_slice())
    }

    /// Formats every cluster inside `region` as VCF rows, per reference in dictionary
    /// order and sorted by start.
    #[must_use]
    pub fn rows(
        &self,
        reference: &ReferenceReader,
        sample: &SampleStatistics,
        region: Option<&Region>,
    ) -> (Vec<String>, ClusterStats) {
        let mut stats = ClusterStats::default();
        let mut rows = Vec::new();

        for (id, clusters) in self.references.iter().enumerate() {
            let Some(chrom) = reference.reference_name(id) else { continue };
            let mut keyed: Vec<(i64, Vec<String>)> = Vec::new();

            for cluster in clusters.snps.values() {
                let start = cluster.start();
                if region.is_some_and(|r| r.excludes_interval(id, start, start)) {
                    continue;
                }
                stats.snp_clusters += 1;
                let fulldepth = sample.exact_coverage(id, start, start);
                let snp_rows = cluster.rows(chrom, fulldepth, self.settings.min_confidence);
                stats.snp_records += snp_rows.len() as u64;
                keyed.push((start, snp_rows));
            }

            for cluster in &clusters.structural {
                let v = cluster.consensus();
                if region.is_some_and(|r| r.excludes_interval(id, v.start, v.end)) {
                    continue;
                }
                stats.structural_clusters += 1;
                stats.structural_records += 1;
                let (max_start, max_end) = cluster.span();
                let fulldepth = sample.exact_coverage(id, max_start, max_end);
                let target_chrom = v
                    .info
                    .target
                    .as_ref()
                    .and_then(|t| reference.reference_name(t.reference));
                keyed.push((v.start, vec![cluster.row(chrom, target_chrom, fulldepth)]));
            }

            keyed.sort_by_key(|(start, _)| *start);
            rows.extend(keyed.into_iter().flat_map(|(_, r)| r));
        }
        (rows, stats)
    }
}
