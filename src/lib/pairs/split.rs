//! Split reads: a soft-clipped read cut into its aligned block and its clipped fragment.
//!
//! The clipped fragment is realigned near the read. When it lands, it becomes a remapped
//! part with its own position and strand; when it does not, it becomes an unmapped part
//! placed directly next to the aligned block on the side it was clipped from.

use super::classifier::ClassifiedPair;
use crate::realign::{Fragment, Placement};
use crate::sam::AlignedRead;
use crate::sam::record_utils::{
    cigar_reference_length, leading_soft_clipping, trailing_soft_clipping,
};

/// One part of a split read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPart {
    /// First aligned position (0-based).
    pub pos: i64,
    /// One past the last aligned position.
    pub end: i64,
    /// Query bases in the part.
    pub len: i64,
    pub is_reverse: bool,
    pub mapq: u8,
    /// No placement was found for the clipped fragment.
    pub unmapped: bool,
    /// The part is the clipped fragment rather than the original aligned block.
    pub remapped: bool,
    /// Soft clips left over after realignment, leading and trailing.
    pub residual_clips: (i64, i64),
    /// Strand disagrees with the expected strand of the split read.
    pub inverted: bool,
}

#[allow(clippy::cast_possible_wrap)]
fn as_i64(v: usize) -> i64 {
    v as i64
}

/// The soft-clipped fragments of a read, in query order, with their ordinals.
///
/// The aligned block takes an ordinal as well, so a trailing clip after a block has
/// ordinal 1 and a leading clip has ordinal 0.
#[must_use]
pub fn clipped_fragments(read: &AlignedRead) -> Vec<Fragment> {
    let lead = leading_soft_clipping(&read.cigar);
    let trail = trailing_soft_clipping(&read.cigar);
    let seq = &read.sequence;
    let mut fragments = Vec::new();
    if lead > 0 {
        fragments.push(Fragment { ordinal: 0, sequence: seq[..lead.min(seq.len())].to_vec() });
    }
    if trail > 0 && trail <= seq.len() {
        let ordinal = if lead > 0 { 2 } else { 1 };
        fragments.push(Fragment { ordinal, sequence: seq[seq.len() - trail..].to_vec() });
    }
    fragments
}

/// A read that resolved into exactly two parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRead {
    pub left: SplitPart,
    pub right: SplitPart,
    /// Position order differs from query order.
    pub rearranged: bool,
}

impl SplitRead {
    /// Builds the parts of `read` from the placements of its clipped fragments.
    ///
    /// Returns `None` unless the read has exactly one soft clip.
    #[must_use]
    pub fn assemble(read: &AlignedRead, placements: &[Placement], expected_reverse: bool) -> Option<Self> {
        let lead = as_i64(leading_soft_clipping(&read.cigar));
        let trail = as_i64(trailing_soft_clipping(&read.cigar));
        if (lead > 0) == (trail > 0) {
            return None;
        }
        let clip_len = lead.max(trail);
        let clip_ordinal = if lead > 0 { 0 } else { 1 };

        let block = SplitPart {
            pos: read.pos,
            end: read.end,
            len: read.len() - clip_len,
            is_reverse: read.is_reverse,
            mapq: read.mapq,
            unmapped: false,
            remapped: false,
            residual_clips: (0, 0),
            inverted: read.is_reverse != expected_reverse,
        };

        let clip = match placements.iter().find(|p| p.ordinal == clip_ordinal) {
            Some(placement) => {
                let is_reverse = read.is_reverse ^ placement.is_reverse;
                SplitPart {
                    pos: placement.pos,
                    end: placement.pos + as_i64(cigar_reference_length(&placement.cigar)),
                    len: clip_len,
                    is_reverse,
                    mapq: placement.mapq,
                    unmapped: false,
                    remapped: true,
                    residual_clips: (
                        as_i64(leading_soft_clipping(&placement.cigar)),
                        as_i64(trailing_soft_clipping(&placement.cigar)),
                    ),
                    inverted: is_reverse != expected_reverse,
                }
            }
            None => {
                let (pos, end) = if lead > 0 {
                    (read.pos - clip_len, read.pos)
                } else {
                    (read.end, read.end + clip_len)
                };
                SplitPart {
                    pos,
                    end,
                    len: clip_len,
                    is_reverse: read.is_reverse,
                    mapq: 0,
                    unmapped: true,
                    remapped: true,
                    residual_clips: (0, 0),
                    inverted: read.is_reverse != expected_reverse,
                }
            }
        };

        let query_order = if lead > 0 { [clip, block] } else { [block, clip] };
        let rearranged = query_order[1].pos < query_order[0].pos;
        let [first, second] = query_order;
        let (left, right) = if rearranged { (second, first) } else { (first, second) };
        Some(Self { left, right, rearranged })
    }

    /// The clipped-fragment part.
    #[must_use]
    pub fn remapped(&self) -> &SplitPart {
        if self.right.remapped { &self.right } else { &self.left }
    }

    /// The original aligned block.
    #[must_use]
    pub fn primary(&self) -> &SplitPart {
        if self.right.remapped { &self.left } else { &self.right }
    }

    /// Every part passes the mapping-quality threshold.
    #[must_use]
    pub fn passes_quality(&self, passes: impl Fn(u8) -> bool) -> bool {
        passes(self.left.mapq) && passes(self.right.mapq)
    }

    /// Every part holds at least `min_len` query bases.
    #[must_use]
    pub fn parts_at_least(&self, min_len: i64) -> bool {
        self.left.len >= min_len && self.right.len >= min_len
    }

    #[must_use]
    pub fn has_gap(&self) -> bool {
        self.left.end < self.right.pos
    }

    #[must_use]
    pub fn has_overlap(&self) -> bool {
        self.right.pos < self.left.end
    }

    /// Bases left clipped at the junction between the two parts.
    #[must_use]
    pub fn junction_clips(&self) -> i64 {
        self.left.residual_clips.1 + self.right.residual_clips.0
    }

    #[must_use]
    pub fn has_insertion(&self) -> bool {
        self.junction_clips() > 0
    }
}

/// A split read together with its unsplit mate.
#[derive(Debug, Clone)]
pub struct SplitPair {
    /// The unsplit read.
    pub read: AlignedRead,
    pub split: SplitRead,
    /// The unsplit read is the primary of the pair.
    pub read_first: bool,
    /// Inner distance of the pair.
    pub actual_size: i64,
}

impl SplitPair {
    /// Assembles the split read of a split pair from the placements of its clipped
    /// fragment. Returns `None` when the read does not split into two parts of passing
    /// mapping quality and at least `min_part_length` bases, or when the pair has no
    /// positive inner distance.
    #[must_use]
    pub fn from_classified(
        pair: &ClassifiedPair,
        placements: &[Placement],
        passes_quality: impl Fn(u8) -> bool,
        min_part_length: i64,
    ) -> Option<Self> {
        let (split, other, read_first, expected_reverse) = pair.split_sides()?;
        let actual_size = pair.actual_size();
        if actual_size <= 0 {
            return None;
        }
        let split = SplitRead::assemble(split, placements, expected_reverse)?;
        if !split.passes_quality(passes_quality) || !split.parts_at_least(min_part_length) {
            return None;
        }
        Some(Self { read: other.clone(), split, read_first, actual_size })
    }

    /// The clipped part reaches past the unsplit read on the far side.
    #[must_use]
    pub fn parts_enclose_pair(&self) -> bool {
        let remapped = self.split.remapped();
        (self.read_first && remapped.pos < self.read.pos)
            || (!self.read_first && self.read.end < remapped.end)
    }

    /// The clipped part overlaps the unsplit read.
    #[must_use]
    pub fn has_overlap(&self) -> bool {
        let remapped = self.split.remapped();
        let read = &self.read;
        (read.pos <= remapped.pos
            && ((read.end <= remapped.end && remapped.pos <= read.end) || remapped.end <= read.end))
            || (remapped.pos <= read.pos
                && ((remapped.end <= read.end && read.pos <= remapped.end)
                    || read.end <= remapped.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairs::{ClassifierSettings, PairClassifier, PairKind};
    use crate::sam::builder::{PairBuilder, RecordBuilder};
    use crate::sam::record_utils::parse_cigar_string;

    fn read(start: usize, cigar: &str, reverse: bool) -> AlignedRead {
        let record = RecordBuilder::mapped_read()
            .alignment_start(start)
            .cigar(cigar)
            .reverse_complement(reverse)
            .build();
        AlignedRead::from_record(&record).expect("decodes").expect("mapped")
    }

    fn placement(ordinal: usize, pos: i64, cigar: &str, reverse: bool) -> Placement {
        Placement {
            ordinal,
            reference: 0,
            pos,
            cigar: parse_cigar_string(cigar),
            mapq: 37,
            is_reverse: reverse,
        }
    }

    #[test]
    fn test_clipped_fragments() {
        let lead = read(101, "10S20M", false);
        let fragments = clipped_fragments(&lead);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].ordinal, 0);
        assert_eq!(fragments[0].sequence, lead.sequence[..10].to_vec());

        let trail = read(101, "20M12S", false);
        let fragments = clipped_fragments(&trail);
        assert_eq!(fragments[0].ordinal, 1);
        assert_eq!(fragments[0].sequence.len(), 12);

        assert_eq!(clipped_fragments(&read(101, "5S20M5S", false)).len(), 2);
    }

    #[test]
    fn test_unmapped_leading_clip_sits_left_of_block() {
        let split = SplitRead::assemble(&read(101, "10S20M", false), &[], false).expect("usable");
        assert!(split.left.unmapped);
        assert_eq!((split.left.pos, split.left.end), (90, 100));
        assert_eq!((split.right.pos, split.right.end), (100, 120));
        assert!(!split.rearranged);
        assert!(!split.has_gap());
        assert!(!split.has_overlap());
        assert_eq!(split.remapped(), &split.left);
        assert_eq!(split.primary(), &split.right);
    }

    #[test]
    fn test_remapped_trailing_clip_with_gap() {
        let placements = [placement(1, 300, "15M", false)];
        let split =
            SplitRead::assemble(&read(101, "20M15S", false), &placements, false).expect("usable");
        assert_eq!((split.left.pos, split.left.end), (100, 120));
        assert_eq!((split.right.pos, split.right.end), (300, 315));
        assert!(split.right.remapped && !split.right.unmapped);
        assert!(split.has_gap());
        assert!(!split.rearranged);
        assert!(!split.right.inverted);
    }

    #[test]
    fn test_rearranged_and_inverted_parts() {
        let placements = [placement(1, 50, "15M", true)];
        let split =
            SplitRead::assemble(&read(101, "20M15S", false), &placements, false).expect("usable");
        assert!(split.rearranged);
        assert_eq!(split.left.pos, 50);
        assert!(split.left.inverted);
        assert!(!split.right.inverted);
    }

    #[test]
    fn test_residual_junction_clips() {
        let placements = [placement(1, 120, "4S11M", false)];
        let split =
            SplitRead::assemble(&read(101, "20M15S", false), &placements, false).expect("usable");
        assert_eq!(split.junction_clips(), 4);
        assert!(split.has_insertion());
    }

    #[test]
    fn test_two_clips_are_unusable() {
        assert!(SplitRead::assemble(&read(101, "10S20M10S", false), &[], false).is_none());
        assert!(SplitRead::assemble(&read(101, "20M", false), &[], false).is_none());
    }

    #[test]
    fn test_split_pair_predicates() {
        let mate = read(401, "20M", true);
        let placements = [placement(0, 390, "10M", false)];
        let split =
            SplitRead::assemble(&read(501, "10S20M", true), &placements, true).expect("usable");
        let pair = SplitPair { read: mate, split, read_first: true, actual_size: 0 };
        assert!(pair.has_overlap());
        assert!(pair.parts_enclose_pair());

        let placements = [placement(0, 450, "10M", false)];
        let split =
            SplitRead::assemble(&read(501, "10S20M", true), &placements, true).expect("usable");
        let pair = SplitPair { read: read(401, "20M", false), split, read_first: true, actual_size: 0 };
        assert!(!pair.has_overlap());
        assert!(!pair.parts_enclose_pair());
    }

    #[test]
    fn test_from_classified() {
        let (r1, r2) = PairBuilder::new("p").r1(0, 101, "20M").r2(0, 481, "10S20M").build();
        let classifier = PairClassifier::new(ClassifierSettings::default(), vec![10_000]);
        let pair = classifier.classify(
            AlignedRead::from_record(&r1).expect("decodes").expect("mapped"),
            Some(AlignedRead::from_record(&r2).expect("decodes").expect("mapped")),
        );
        assert_eq!(pair.kind, PairKind::MateSplit);
        let passes = |q| classifier.settings().passes_quality(q);

        let split = SplitPair::from_classified(&pair, &[], passes, 10).expect("usable");
        assert!(split.read_first);
        assert_eq!(split.read.pos, 100);
        assert_eq!(split.actual_size, 359);
        assert!(split.split.left.unmapped);
        assert_eq!(split.split.right.pos, 480);

        let low_quality = Placement { mapq: 5, ..placement(0, 300, "10M", false) };
        assert!(SplitPair::from_classified(&pair, &[low_quality], passes, 10).is_none());
        assert!(SplitPair::from_classified(&pair, &[], passes, 11).is_none());
    }
}
