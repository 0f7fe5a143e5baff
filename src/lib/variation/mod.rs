//! Variation value type.
//!
//! A [`Variation`] is one candidate call: a kind, a locus and the [`Info`] describing how
//! precisely that locus is known. Variations are plain values. Combining two of them never
//! mutates either operand; [`join`] builds a new one.

pub mod info;
pub mod join;

pub use info::{Info, LengthRange, Slack, Target};
pub use join::join;

use std::fmt;

/// Kind of a variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariationKind {
    Snp,
    Deletion,
    Insertion,
    Inversion,
    Duplication,
    TandemDuplication,
    Translocation,
}

impl VariationKind {
    /// The VCF `SVTYPE` value, `None` for SNPs.
    #[must_use]
    pub fn svtype(self) -> Option<&'static str> {
        match self {
            VariationKind::Snp => None,
            VariationKind::Deletion => Some("DEL"),
            VariationKind::Insertion => Some("INS"),
            VariationKind::Inversion => Some("INV"),
            VariationKind::Duplication => Some("DUP"),
            VariationKind::TandemDuplication => Some("DUP:TANDEM"),
            VariationKind::Translocation => Some("INS:TRA"),
        }
    }

    /// True for kinds located at a single point of the reference.
    #[must_use]
    pub fn is_point(self) -> bool {
        matches!(self, VariationKind::Snp | VariationKind::Insertion | VariationKind::Translocation)
    }
}

impl fmt::Display for VariationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.svtype().unwrap_or("SNP"))
    }
}

/// Signal a variation was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceMethod {
    /// CIGAR operations and the MD tag of one read.
    EditTag,
    /// Geometry of a read pair.
    ReadPair,
    /// Geometry of a split read.
    SplitRead,
    /// Product of joining other variations.
    Joined,
}

/// A candidate variant call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variation {
    pub kind: VariationKind,
    pub reference: usize,
    /// First affected position (0-based).
    pub start: i64,
    /// Last affected position (0-based); equals `start` for point kinds.
    pub end: i64,
    /// Reference base(s) at `start`.
    pub ref_seq: String,
    /// Alternate base(s); empty for structural kinds.
    pub alt_seq: String,
    pub method: EvidenceMethod,
    pub info: Info,
}

impl Variation {
    /// A single-base substitution.
    #[must_use]
    pub fn snp(reference: usize, pos: i64, ref_base: u8, alt_base: u8) -> Self {
        Self {
            kind: VariationKind::Snp,
            reference,
            start: pos,
            end: pos,
            ref_seq: char::from(ref_base.to_ascii_uppercase()).to_string(),
            alt_seq: char::from(alt_base.to_ascii_uppercase()).to_string(),
            method: EvidenceMethod::EditTag,
            info: Info::exact(),
        }
    }

    /// A structural variation with normalized confidence fields.
    ///
    /// Point kinds ignore `end` and are placed at `start`.
    #[must_use]
    pub fn structural(
        kind: VariationKind,
        reference: usize,
        start: i64,
        end: i64,
        ref_base: u8,
        method: EvidenceMethod,
        mut info: Info,
    ) -> Self {
        let end = if kind.is_point() { start } else { end.max(start) };
        info.normalize(start);
        Self {
            kind,
            reference,
            start,
            end,
            ref_seq: char::from(ref_base.to_ascii_uppercase()).to_string(),
            alt_seq: String::new(),
            method,
            info,
        }
    }

    /// Leftmost possible start.
    #[must_use]
    pub fn max_start(&self) -> i64 {
        self.start + self.info.cpos.unwrap_or(0)
    }

    /// Rightmost possible end.
    #[must_use]
    pub fn max_end(&self) -> i64 {
        self.end + self.info.cend.unwrap_or(0)
    }

    #[must_use]
    pub fn depth(&self) -> u32 {
        self.info.depth
    }

    #[must_use]
    pub fn is_imprecise(&self) -> bool {
        self.info.imprecise
    }
}
