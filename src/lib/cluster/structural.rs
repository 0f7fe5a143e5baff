//! Structural clusters: a consensus variation grown by repeated joins.

use super::{confidence, format_confidence};
use crate::interval_index::Span;
use crate::variation::{Variation, VariationKind, join};

/// The consensus of every structural variation joined so far.
#[derive(Debug, Clone)]
pub struct StructuralCluster {
    consensus: Variation,
}

impl StructuralCluster {
    #[must_use]
    pub fn new(v: Variation) -> Self {
        Self { consensus: v }
    }

    #[must_use]
    pub fn consensus(&self) -> &Variation {
        &self.consensus
    }

    /// Index key: the maximal span of the consensus.
    #[must_use]
    pub fn span(&self) -> Span {
        (self.consensus.max_start(), self.consensus.max_end())
    }

    /// Joins `v` into the consensus. Returns `false`, leaving the cluster untouched, when
    /// the two cannot describe the same event.
    pub fn add(&mut self, v: &Variation) -> bool {
        match join(&self.consensus, v) {
            Some(joined) => {
                self.consensus = joined;
                true
            }
            None => false,
        }
    }

    /// The VCF row of the consensus. `target_chrom` names the reference of a
    /// translocation target.
    #[must_use]
    pub fn row(&self, chrom: &str, target_chrom: Option<&str>, fulldepth: usize) -> String {
        let v = &self.consensus;
        let info = &v.info;
        let svtype = v.kind.svtype().unwrap_or("SNP");
        let alt = if v.kind == VariationKind::Inversion {
            "<INV>".to_string()
        } else {
            format!("{}<{svtype}>", v.ref_seq)
        };

        let mut fields: Vec<String> = Vec::new();
        if info.imprecise {
            fields.push("IMPRECISE".to_string());
        }
        fields.push(format!("SVTYPE={svtype}"));
        if let Some(cpos) = info.cpos {
            fields.push(format!("CPOS={cpos}"));
        }
        if !v.kind.is_point() {
            fields.push(format!("END={}", v.end + 1));
        }
        if let Some(cend) = info.cend {
            fields.push(format!("CEND={cend}"));
        }
        if let Some(svlen) = info.svlen {
            fields.push(format!("SVLEN={svlen}"));
        }
        if let Some(cilen) = info.cilen {
            fields.push(format!("CILEN={cilen}"));
        }
        fields.push(format!("CONF={}", format_confidence(confidence(info.depth, fulldepth))));
        fields.push(format!("DEPTH={}", info.depth));
        fields.push(format!("FULLDEPTH={fulldepth}"));
        if let Some(target) = &info.target {
            if let Some(name) = target_chrom {
                fields.push(format!("TRACHROM={name}"));
            }
            fields.push(format!("TRAPOS={}", target.pos + 1));
            if let Some(cpos) = target.cpos {
                fields.push(format!("TRACPOS={cpos}"));
            }
            fields.push(format!("TRAEND={}", target.end + 1));
            if let Some(cend) = target.cend {
                fields.push(format!("TRACEND={cend}"));
            }
        }

        format!("{chrom}\t{}\t.\t{}\t{alt}\t.\t.\t{}", v.start + 1, v.ref_seq, fields.join(";"))
    }
}
