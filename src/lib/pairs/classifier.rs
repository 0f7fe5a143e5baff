//! Classification of a read and its mate into one evidence category.
//!
//! The earlier of the two reads (by reference, then start) becomes the primary. Its
//! expected strand depends on the library [`Policy`]: forward for the primary and reverse
//! for the mate under forward/reverse, the opposite under reverse/forward. A read whose
//! strand disagrees with the expectation is *inverted*; a pair where both reads are
//! inverted is *rearranged*.

use crate::sam::AlignedRead;
use crate::sam::record_utils::{leading_soft_clipping, trailing_soft_clipping};
use clap::ValueEnum;
use std::cmp::Ordering;

/// Expected orientation of the two reads of a pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Primary read forward, mate reverse.
    #[default]
    #[value(name = "fr")]
    ForwardReverse,
    /// Primary read reverse, mate forward.
    #[value(name = "rf")]
    ReverseForward,
}

impl Policy {
    /// Whether the primary (`true`) or the mate (`false`) is expected on the reverse strand.
    #[must_use]
    pub fn expects_reverse(self, primary: bool) -> bool {
        match self {
            Policy::ForwardReverse => !primary,
            Policy::ReverseForward => primary,
        }
    }
}

/// Evidence category of a classified pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    /// Both reads aligned without clipping or gaps.
    Normal,
    /// Only one usable read.
    Single,
    /// The primary read is soft-clipped.
    ReadSplit,
    /// The mate is soft-clipped.
    MateSplit,
    /// Not usable as evidence.
    Filtered,
}

/// Thresholds used while classifying.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierSettings {
    /// Minimum mapping quality; a quality of 0 always passes.
    pub min_quality: u8,
    /// Minimum length of every part of a split read.
    pub min_part_length: i64,
    pub policy: Policy,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self { min_quality: 30, min_part_length: 10, policy: Policy::ForwardReverse }
    }
}

impl ClassifierSettings {
    /// True when the mapping quality is unknown (0) or at least the minimum.
    #[must_use]
    pub fn passes_quality(&self, mapq: u8) -> bool {
        mapq == 0 || mapq >= self.min_quality
    }
}

/// A read, its optional mate and their category.
#[derive(Debug, Clone)]
pub struct ClassifiedPair {
    /// The earlier read of the pair, or the only usable read.
    pub read: AlignedRead,
    pub mate: Option<AlignedRead>,
    pub kind: PairKind,
    pub policy: Policy,
    /// Total length of the references from the read's up to (excluding) the mate's.
    reference_gap: i64,
}

impl ClassifiedPair {
    fn single(read: AlignedRead, policy: Policy) -> Self {
        let kind = if read.is_duplicate { PairKind::Filtered } else { PairKind::Single };
        Self { read, mate: None, kind, policy, reference_gap: 0 }
    }

    fn filtered(read: AlignedRead, mate: Option<AlignedRead>, policy: Policy) -> Self {
        Self { read, mate, kind: PairKind::Filtered, policy, reference_gap: 0 }
    }

    /// The primary read's strand disagrees with the policy.
    #[must_use]
    pub fn read_inverted(&self) -> bool {
        self.read.is_reverse != self.policy.expects_reverse(true)
    }

    /// The mate's strand disagrees with the policy.
    #[must_use]
    pub fn mate_inverted(&self) -> bool {
        self.mate.as_ref().is_some_and(|m| m.is_reverse != self.policy.expects_reverse(false))
    }

    #[must_use]
    pub fn is_rearranged(&self) -> bool {
        self.read_inverted() && self.mate_inverted()
    }

    #[must_use]
    pub fn is_interchromosomal(&self) -> bool {
        self.mate.as_ref().is_some_and(|m| m.reference != self.read.reference)
    }

    /// The mate starts inside or touching the primary read.
    #[must_use]
    pub fn has_overlap(&self) -> bool {
        let Some(mate) = &self.mate else { return false };
        let read = &self.read;
        read.pos <= mate.pos
            && ((read.end <= mate.end && mate.pos <= read.end) || mate.end <= read.end)
    }

    /// Inner distance reported by the aligner, for plain normal pairs only, else 0.
    #[must_use]
    pub fn size(&self) -> i64 {
        let Some(mate) = &self.mate else { return 0 };
        if self.kind != PairKind::Normal
            || self.has_overlap()
            || self.read_inverted()
            || self.mate_inverted()
            || self.is_interchromosomal()
        {
            return 0;
        }
        self.read.template_length.abs() - self.read.span() - mate.span()
    }

    /// Inner distance, computed from the alignment when the aligner gives none.
    ///
    /// Rearranged pairs yield a negative value.
    #[must_use]
    pub fn actual_size(&self) -> i64 {
        let size = self.size();
        let Some(mate) = &self.mate else { return size };
        if size != 0 {
            return size;
        }
        let read = &self.read;
        if self.has_overlap() {
            return if self.is_rearranged() { read.pos - mate.end } else { mate.pos - read.end };
        }
        let result = self.reference_gap + mate.pos - read.end - 1;
        if self.is_rearranged() { -(result + read.span() + mate.span()) } else { result }
    }

    /// The clipped read of a split pair, the other read, whether the other read
    /// precedes the clipped one, and the clipped read's expected strand.
    #[must_use]
    pub fn split_sides(&self) -> Option<(&AlignedRead, &AlignedRead, bool, bool)> {
        let mate = self.mate.as_ref()?;
        match self.kind {
            PairKind::ReadSplit => {
                Some((&self.read, mate, false, self.policy.expects_reverse(true)))
            }
            PairKind::MateSplit => {
                Some((mate, &self.read, true, self.policy.expects_reverse(false)))
            }
            _ => None,
        }
    }
}

/// Classifies pairs against a reference dictionary.
#[derive(Debug, Clone)]
pub struct PairClassifier {
    settings: ClassifierSettings,
    reference_lengths: Vec<i64>,
}

impl PairClassifier {
    #[must_use]
    pub fn new(settings: ClassifierSettings, reference_lengths: Vec<i64>) -> Self {
        Self { settings, reference_lengths }
    }

    #[must_use]
    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// True when `a` is the primary of the pair `(a, b)`.
    fn precedes(a: &AlignedRead, b: &AlignedRead) -> bool {
        match (a.reference, a.pos).cmp(&(b.reference, b.pos)) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a.is_first_segment || !b.is_first_segment,
        }
    }

    /// True when every soft-clip and every aligned block between clips is long enough.
    fn has_min_part_lengths(&self, read: &AlignedRead) -> bool {
        let lead = i64::try_from(leading_soft_clipping(&read.cigar)).unwrap_or(i64::MAX);
        let trail = i64::try_from(trailing_soft_clipping(&read.cigar)).unwrap_or(i64::MAX);
        let block = read.len() - lead - trail;
        let min = self.settings.min_part_length;
        (lead == 0 || lead >= min) && (trail == 0 || trail >= min) && block >= min
    }

    fn gap_between(&self, from: usize, to: usize) -> i64 {
        if from >= to {
            return 0;
        }
        self.reference_lengths.get(from..to).map_or(0, |lengths| lengths.iter().sum())
    }

    /// Classifies a read and its mate.
    #[must_use]
    pub fn classify(&self, read: AlignedRead, mate: Option<AlignedRead>) -> ClassifiedPair {
        let policy = self.settings.policy;
        let (read, mate) = match mate {
            Some(mate) if !Self::precedes(&read, &mate) => (mate, Some(read)),
            other => (read, other),
        };

        if !self.settings.passes_quality(read.mapq) {
            return match mate {
                Some(mate) if self.settings.passes_quality(mate.mapq) => {
                    ClassifiedPair::single(mate, policy)
                }
                mate => ClassifiedPair::filtered(read, mate, policy),
            };
        }
        let mate = match mate {
            Some(mate) if self.settings.passes_quality(mate.mapq) => mate,
            _ => return ClassifiedPair::single(read, policy),
        };

        match (read.is_duplicate, mate.is_duplicate) {
            (true, true) => return ClassifiedPair::filtered(read, Some(mate), policy),
            (true, false) => return ClassifiedPair::single(mate, policy),
            (false, true) => return ClassifiedPair::single(read, policy),
            (false, false) => {}
        }

        let reference_gap = self.gap_between(read.reference, mate.reference);
        let mut pair =
            ClassifiedPair { read, mate: Some(mate), kind: PairKind::Filtered, policy, reference_gap };
        let Some(mate) = pair.mate.as_ref() else { return pair };

        pair.kind = if pair.read.has_soft_clip() {
            if pair.mate_inverted() || mate.has_gaps() || pair.is_interchromosomal() {
                PairKind::Filtered
            } else {
                PairKind::ReadSplit
            }
        } else if mate.has_soft_clip() {
            if pair.read_inverted() || pair.read.has_gaps() || pair.is_interchromosomal() {
                PairKind::Filtered
            } else {
                PairKind::MateSplit
            }
        } else if !pair.read.has_gaps() && !mate.has_gaps() {
            PairKind::Normal
        } else {
            PairKind::Filtered
        };

        if let Some((split, _, _, _)) = pair.split_sides() {
            if !self.has_min_part_lengths(split) || pair.actual_size() <= 0 {
                pair.kind = PairKind::Filtered;
            }
        }
        pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sam::builder::{PairBuilder, RecordBuilder};
    use noodles::sam::alignment::record_buf::RecordBuf;
    use rstest::rstest;

    fn decode(record: &RecordBuf) -> AlignedRead {
        AlignedRead::from_record(record).expect("decodes").expect("mapped")
    }

    fn classifier() -> PairClassifier {
        PairClassifier::new(ClassifierSettings::default(), vec![10_000, 20_000, 30_000])
    }

    fn classify(builder: PairBuilder) -> ClassifiedPair {
        let (r1, r2) = builder.build();
        classifier().classify(decode(&r1), Some(decode(&r2)))
    }

    #[test]
    fn test_normal_pair_size() {
        // 20bp reads at 101 and 481 (1-based): tlen 400, inner distance 360.
        let pair = classify(PairBuilder::new("p").r1(0, 101, "20M").r2(0, 481, "20M"));
        assert_eq!(pair.kind, PairKind::Normal);
        assert_eq!(pair.read.pos, 100);
        assert_eq!(pair.size(), 360);
        assert_eq!(pair.actual_size(), 360);
        assert!(!pair.has_overlap());
        assert!(!pair.is_rearranged());
    }

    #[test]
    fn test_primary_is_earlier_read() {
        let (r1, r2) =
            PairBuilder::new("p").r1(0, 481, "20M").r2(0, 101, "20M").strands(true, false).build();
        let pair = classifier().classify(decode(&r1), Some(decode(&r2)));
        assert_eq!(pair.read.pos, 100);
        assert!(!pair.read.is_first_segment);
        assert!(!pair.read_inverted());
        assert!(!pair.mate_inverted());
    }

    #[test]
    fn test_same_start_prefers_first_segment() {
        let (r1, r2) = PairBuilder::new("p").r1(0, 101, "20M").r2(0, 101, "20M").build();
        let pair = classifier().classify(decode(&r2), Some(decode(&r1)));
        assert!(pair.read.is_first_segment);
    }

    #[rstest]
    #[case(10, 60, PairKind::Single, true)]
    #[case(10, 10, PairKind::Filtered, true)]
    #[case(60, 10, PairKind::Single, true)]
    #[case(0, 60, PairKind::Normal, true)]
    #[case(60, 0, PairKind::Normal, true)]
    fn test_quality_rules(
        #[case] q1: u8,
        #[case] q2: u8,
        #[case] kind: PairKind,
        #[case] first_survives: bool,
    ) {
        let pair = classify(
            PairBuilder::new("p")
                .r1(0, 101, "20M")
                .r2(0, 481, "20M")
                .with_r1(|r| r.mapping_quality(q1))
                .with_r2(|r| r.mapping_quality(q2)),
        );
        assert_eq!(pair.kind, kind);
        if kind == PairKind::Single {
            let survivor_is_first = pair.read.is_first_segment;
            assert_eq!(survivor_is_first, q1 >= 30 && first_survives);
            assert!(pair.mate.is_none());
        }
    }

    #[rstest]
    #[case(true, true, PairKind::Filtered)]
    #[case(true, false, PairKind::Single)]
    #[case(false, true, PairKind::Single)]
    fn test_duplicate_rules(#[case] d1: bool, #[case] d2: bool, #[case] kind: PairKind) {
        let pair = classify(
            PairBuilder::new("p")
                .r1(0, 101, "20M")
                .r2(0, 481, "20M")
                .with_r1(|r| r.duplicate(d1))
                .with_r2(|r| r.duplicate(d2)),
        );
        assert_eq!(pair.kind, kind);
        if kind == PairKind::Single {
            assert!(!pair.read.is_duplicate);
        }
    }

    #[test]
    fn test_singletons() {
        let read = decode(&RecordBuilder::mapped_read().alignment_start(10).cigar("20M").build());
        let pair = classifier().classify(read.clone(), None);
        assert_eq!(pair.kind, PairKind::Single);
        assert_eq!(pair.actual_size(), 0);

        let mut dup = read;
        dup.is_duplicate = true;
        assert_eq!(classifier().classify(dup, None).kind, PairKind::Filtered);
    }

    #[test]
    fn test_split_classification() {
        let read_split = classify(PairBuilder::new("p").r1(0, 101, "10S20M").r2(0, 481, "20M"));
        assert_eq!(read_split.kind, PairKind::ReadSplit);
        let (split, other, read_first, _) = read_split.split_sides().expect("split");
        assert!(split.has_soft_clip());
        assert!(!other.has_soft_clip());
        assert!(!read_first);

        let mate_split = classify(PairBuilder::new("p").r1(0, 101, "20M").r2(0, 481, "20M12S"));
        assert_eq!(mate_split.kind, PairKind::MateSplit);
        assert!(mate_split.split_sides().expect("split").2);
    }

    #[rstest]
    #[case::inverted_mate(PairBuilder::new("p").r1(0, 101, "10S20M").r2(0, 481, "20M").strands(false, false))]
    #[case::gapped_mate(PairBuilder::new("p").r1(0, 101, "10S20M").r2(0, 481, "10M50N10M"))]
    #[case::interchromosomal(PairBuilder::new("p").r1(0, 101, "10S20M").r2(1, 481, "20M"))]
    #[case::short_clip(PairBuilder::new("p").r1(0, 101, "5S20M").r2(0, 481, "20M"))]
    #[case::short_block(PairBuilder::new("p").r1(0, 101, "20S8M").r2(0, 481, "20M"))]
    #[case::gapped_normal(PairBuilder::new("p").r1(0, 101, "10M50N10M").r2(0, 481, "20M"))]
    fn test_filtered(#[case] builder: PairBuilder) {
        assert_eq!(classify(builder).kind, PairKind::Filtered);
    }

    #[test]
    fn test_overlap_and_rearranged_sizes() {
        let overlap = classify(PairBuilder::new("p").r1(0, 101, "20M").r2(0, 111, "20M"));
        assert!(overlap.has_overlap());
        assert_eq!(overlap.size(), 0);
        assert_eq!(overlap.actual_size(), -10);

        let rearranged = classify(
            PairBuilder::new("p").r1(0, 101, "20M").r2(0, 301, "20M").strands(true, false),
        );
        assert!(rearranged.is_rearranged());
        assert_eq!(rearranged.size(), 0);
        assert_eq!(rearranged.actual_size(), -(179 + 20 + 20));
    }

    #[test]
    fn test_interchromosomal_size_spans_references() {
        let pair = classify(PairBuilder::new("p").r1(0, 9_001, "20M").r2(2, 101, "20M"));
        assert!(pair.is_interchromosomal());
        assert_eq!(pair.kind, PairKind::Normal);
        assert_eq!(pair.actual_size(), 30_000 + 100 - 9_020 - 1);
    }

    #[test]
    fn test_reverse_forward_policy() {
        let settings = ClassifierSettings { policy: Policy::ReverseForward, ..Default::default() };
        let classifier = PairClassifier::new(settings, vec![10_000]);
        let (r1, r2) =
            PairBuilder::new("p").r1(0, 101, "20M").r2(0, 481, "20M").strands(true, false).build();
        let pair = classifier.classify(decode(&r1), Some(decode(&r2)));
        assert!(!pair.read_inverted());
        assert!(!pair.mate_inverted());
        assert_eq!(pair.size(), 360);
    }
}
