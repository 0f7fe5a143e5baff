//! SNP clusters: every allele observed at one reference position.

use super::format_confidence;
use crate::variation::{Variation, VariationKind};
use itertools::Itertools;

/// One observed allele and the number of reads supporting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allele {
    pub ref_seq: String,
    pub alt_seq: String,
    pub depth: u32,
}

/// Alleles sharing a start position.
#[derive(Debug, Clone)]
pub struct SnpCluster {
    reference: usize,
    start: i64,
    alleles: Vec<Allele>,
    offered: u32,
}

impl SnpCluster {
    /// A cluster seeded with `v`.
    #[must_use]
    pub fn new(v: &Variation) -> Self {
        let mut cluster = Self { reference: v.reference, start: v.start, alleles: Vec::new(), offered: 0 };
        cluster.add(v);
        cluster
    }

    #[must_use]
    pub fn reference(&self) -> usize {
        self.reference
    }

    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    #[must_use]
    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }

    /// Reads offered to and accepted by this cluster.
    #[must_use]
    pub fn offered(&self) -> u32 {
        self.offered
    }

    /// Accepts `v` when it is a SNP at this cluster's position. A repeated allele, the same
    /// reference and alternate base, only raises its depth.
    pub fn add(&mut self, v: &Variation) -> bool {
        if v.kind != VariationKind::Snp || v.reference != self.reference || v.start != self.start {
            return false;
        }
        self.offered += 1;
        match self.alleles.iter_mut().find(|a| a.ref_seq == v.ref_seq && a.alt_seq == v.alt_seq) {
            Some(allele) => allele.depth += 1,
            None => self.alleles.push(Allele {
                ref_seq: v.ref_seq.clone(),
                alt_seq: v.alt_seq.clone(),
                depth: 1,
            }),
        }
        true
    }

    /// One row per distinct reference base, keeping the alleles whose confidence reaches
    /// `min_confidence`.
    #[must_use]
    pub fn rows(&self, chrom: &str, fulldepth: usize, min_confidence: f64) -> Vec<String> {
        self.alleles
            .iter()
            .map(|a| a.ref_seq.as_str())
            .unique()
            .filter_map(|ref_seq| {
                let kept: Vec<(&Allele, f64)> = self
                    .alleles
                    .iter()
                    .filter(|a| a.ref_seq == ref_seq)
                    .map(|a| (a, super::confidence(a.depth, fulldepth)))
                    .filter(|&(_, conf)| conf >= min_confidence)
                    .collect();
                if kept.is_empty() {
                    return None;
                }
                Some(format!(
                    "{chrom}\t{}\t.\t{ref_seq}\t{}\t.\t.\tCONF={};DEPTH={};FULLDEPTH={fulldepth}",
                    self.start + 1,
                    kept.iter().map(|(a, _)| &a.alt_seq).join(","),
                    kept.iter().map(|&(_, c)| format_confidence(c)).join(","),
                    kept.iter().map(|(a, _)| a.depth).join(","),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_alleles_raise_depth() {
        let mut cluster = SnpCluster::new(&Variation::snp(0, 99, b'A', b'C'));
        assert!(cluster.add(&Variation::snp(0, 99, b'A', b'C')));
        assert!(cluster.add(&Variation::snp(0, 99, b'A', b'T')));
        assert!(!cluster.add(&Variation::snp(0, 100, b'A', b'T')));
        assert!(!cluster.add(&Variation::snp(1, 99, b'A', b'T')));
        assert_eq!(cluster.alleles().len(), 2);
        assert_eq!(cluster.alleles()[0].depth, 2);
        let total: u32 = cluster.alleles().iter().map(|a| a.depth).sum();
        assert!(total <= cluster.offered());
    }

    #[test]
    fn test_alleles_keyed_on_reference_base() {
        let mut cluster = SnpCluster::new(&Variation::snp(0, 99, b'A', b'T'));
        cluster.add(&Variation::snp(0, 99, b'G', b'T'));
        assert_eq!(cluster.alleles().len(), 2);
        assert!(cluster.alleles().iter().all(|a| a.depth == 1));
        assert_eq!(
            cluster.rows("chr1", 4, 0.0),
            vec![
                "chr1\t100\t.\tA\tT\t.\t.\tCONF=0.25;DEPTH=1;FULLDEPTH=4".to_string(),
                "chr1\t100\t.\tG\tT\t.\t.\tCONF=0.25;DEPTH=1;FULLDEPTH=4".to_string(),
            ]
        );
    }

    #[test]
    fn test_rows() {
        let mut cluster = SnpCluster::new(&Variation::snp(0, 99, b'A', b'C'));
        cluster.add(&Variation::snp(0, 99, b'A', b'C'));
        cluster.add(&Variation::snp(0, 99, b'A', b'T'));
        cluster.add(&Variation::snp(0, 99, b'G', b'T'));

        let rows = cluster.rows("chr1", 4, 0.0);
        assert_eq!(
            rows,
            vec![
                "chr1\t100\t.\tA\tC,T\t.\t.\tCONF=0.5,0.25;DEPTH=2,1;FULLDEPTH=4".to_string(),
                "chr1\t100\t.\tG\tT\t.\t.\tCONF=0.25;DEPTH=1;FULLDEPTH=4".to_string(),
            ]
        );

        let rows = cluster.rows("chr1", 4, 0.3);
        assert_eq!(rows, vec!["chr1\t100\t.\tA\tC\t.\t.\tCONF=0.5;DEPTH=2;FULLDEPTH=4".to_string()]);
        assert!(cluster.rows("chr1", 4, 0.9).is_empty());
    }

    #[test]
    fn test_zero_fulldepth_is_fully_confident() {
        let cluster = SnpCluster::new(&Variation::snp(0, 0, b'A', b'C'));
        assert_eq!(cluster.rows("chr1", 0, 1.0), vec![
            "chr1\t1\t.\tA\tC\t.\t.\tCONF=1;DEPTH=1;FULLDEPTH=0".to_string()
        ]);
    }
}
