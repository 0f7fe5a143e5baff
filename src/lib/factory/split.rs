//! Structural hypotheses from split reads.
//!
//! A split read pins one breakpoint to the base: the junction between its two parts. The
//! other side of the event is bounded by the unsplit mate and the insert window. `L` and
//! `R` below are the split read's parts in reference order.

use super::{Hypotheses, InsertWindow};
use crate::pairs::{SplitPair, SplitPart};
use crate::reference::ReferenceReader;
use crate::variation::{EvidenceMethod, Info, LengthRange, Slack, Target, Variation, VariationKind};

/// Builds hypotheses from split pairs.
#[derive(Debug, Clone, Copy)]
pub struct SplitFactory<'a> {
    reference: &'a ReferenceReader,
    window: InsertWindow,
}

impl<'a> SplitFactory<'a> {
    #[must_use]
    pub fn new(reference: &'a ReferenceReader, window: InsertWindow) -> Self {
        Self { reference, window }
    }

    /// Hypotheses explaining `pair`, or `None` when its parts describe no event.
    #[must_use]
    pub fn hypotheses(&self, pair: &SplitPair) -> Option<Hypotheses> {
        let split = &pair.split;
        let (left, right) = (&split.left, &split.right);
        let enclose = pair.parts_enclose_pair();

        let hypotheses = if left.unmapped {
            if right.inverted {
                return None;
            }
            let insertion = if pair.read_first {
                self.left_enclosed_insertion(pair)
            } else {
                self.open_insertion(pair, right.pos - 1, left.len)
            };
            Hypotheses::Single(insertion)
        } else if right.unmapped {
            if left.inverted {
                return None;
            }
            let insertion = if pair.read_first {
                self.open_insertion(pair, left.end - 1, right.len)
            } else {
                self.right_enclosed_insertion(pair)
            };
            Hypotheses::Single(insertion)
        } else if left.inverted {
            if enclose || split.rearranged || right.inverted {
                return None;
            }
            let (remapped, primary) = (split.remapped(), split.primary());
            Hypotheses::Single(self.inversion(pair, remapped.pos, primary.pos))
        } else if right.inverted {
            if enclose || split.rearranged {
                return None;
            }
            let (remapped, primary) = (split.remapped(), split.primary());
            Hypotheses::Single(self.inversion(pair, primary.end, remapped.end))
        } else if pair.has_overlap() {
            Hypotheses::Group(self.overlap_pair(pair))
        } else if enclose {
            Hypotheses::Group(if split.rearranged {
                self.enclose_rearranged(pair)
            } else {
                self.enclose(pair)
            })
        } else if split.rearranged {
            if split.has_gap() {
                Hypotheses::Group(vec![
                    self.deletion(pair),
                    self.left_translocation_rearranged(pair),
                    self.right_translocation_rearranged(pair),
                ])
            } else {
                Hypotheses::Single(self.overlap_rearranged_parts(pair))
            }
        } else if split.has_gap() {
            Hypotheses::Group(vec![
                self.deletion(pair),
                self.left_duplication(pair),
                self.right_duplication(pair),
                self.left_translocation(pair),
                self.right_translocation(pair),
            ])
        } else if split.has_overlap() {
            let info = Info::exact();
            Hypotheses::Single(self.variation(
                VariationKind::TandemDuplication,
                pair,
                right.pos - 1,
                left.end,
                info,
            ))
        } else if split.has_insertion() {
            let info = Info::exact().svlen(split.junction_clips());
            let pos = left.end - 1;
            Hypotheses::Single(self.variation(VariationKind::Insertion, pair, pos, pos, info))
        } else {
            return None;
        };
        Some(hypotheses)
    }

    fn variation(
        &self,
        kind: VariationKind,
        pair: &SplitPair,
        pos: i64,
        end: i64,
        info: Info,
    ) -> Variation {
        let reference = pair.read.reference;
        Variation::structural(
            kind,
            reference,
            pos,
            end,
            self.reference.base_at(reference, pos),
            EvidenceMethod::SplitRead,
            info,
        )
    }

    /// The locus covered by `part`, with optional confidence on either side.
    fn target(pair: &SplitPair, part: &SplitPart, cpos: Option<Slack>, cend: Option<Slack>) -> Target {
        Target { reference: pair.read.reference, pos: part.pos, end: part.end - 1, cpos, cend }
    }

    /// An insertion whose length is bounded by the insert window.
    fn enclosed_insertion(&self, pair: &SplitPair, pos: i64, part_len: i64) -> Variation {
        let min = part_len.max(self.window.min - pair.actual_size);
        let max = min.max(self.window.max - pair.actual_size);
        let info = Info::exact().cilen(LengthRange::new(min, max));
        self.variation(VariationKind::Insertion, pair, pos, pos, info)
    }

    fn left_enclosed_insertion(&self, pair: &SplitPair) -> Variation {
        let split = &pair.split;
        self.enclosed_insertion(pair, split.right.pos - 1, split.left.len)
    }

    fn right_enclosed_insertion(&self, pair: &SplitPair) -> Variation {
        let split = &pair.split;
        self.enclosed_insertion(pair, split.left.end - 1, split.right.len)
    }

    /// An insertion at least as long as the unplaced part.
    fn open_insertion(&self, pair: &SplitPair, pos: i64, part_len: i64) -> Variation {
        let info = Info::exact().cilen(LengthRange::at_least(part_len));
        self.variation(VariationKind::Insertion, pair, pos, pos, info)
    }

    fn inversion(&self, pair: &SplitPair, pos: i64, end: i64) -> Variation {
        self.variation(VariationKind::Inversion, pair, pos, end, Info::exact())
    }

    fn deletion(&self, pair: &SplitPair) -> Variation {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let info = Info::exact().svlen(right.pos - left.end);
        self.variation(VariationKind::Deletion, pair, left.end - 1, right.pos - 1, info)
    }

    /// The remapped part overlaps the mate: the duplicated copy may start at either end of
    /// the overlap.
    fn overlap_pair(&self, pair: &SplitPair) -> Vec<Variation> {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let remapped = pair.split.remapped();
        let pos = pair.read.pos.max(remapped.pos) - 1;
        let end = pair.read.end.min(remapped.end);
        let (widened_end, widened_start) = if pair.read_first {
            (Info::exact().cend(left.end - end), Info::exact().cpos(end - (right.pos - left.len)))
        } else {
            (Info::exact().cend(pos - left.end - right.len), Info::exact().cpos(right.pos - pos))
        };
        vec![
            self.variation(VariationKind::Duplication, pair, pos, end, widened_end),
            self.variation(VariationKind::Duplication, pair, pos, end, widened_start),
        ]
    }

    fn overlap_rearranged_parts(&self, pair: &SplitPair) -> Variation {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let cend = (right.pos - left.pos) + (right.end - left.end);
        let info = Info::exact().cpos(-cend).cend(cend);
        self.variation(VariationKind::Duplication, pair, right.pos - 1, left.end, info)
    }

    /// A duplication of `L` placed right of it, or a tandem duplication when the
    /// copies abut exactly.
    fn left_duplication(&self, pair: &SplitPair) -> Variation {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let pos = left.pos - 1;
        let mut end = left.end;
        let cend = right.pos - end - left.len;
        let mut kind = VariationKind::Duplication;
        let info = if cend < 0 {
            end += cend;
            if left.len % 2 == 0 && left.len / 2 == -cend {
                kind = VariationKind::TandemDuplication;
            }
            Info::exact()
        } else {
            Info::exact().cpos(-cend).cend(cend)
        };
        self.variation(kind, pair, pos, end, info)
    }

    /// A duplication of `R` placed left of it, or a tandem duplication when the
    /// copies abut exactly.
    fn right_duplication(&self, pair: &SplitPair) -> Variation {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let mut pos = right.pos - 1;
        let cend = pos - left.end - right.len;
        let mut kind = VariationKind::Duplication;
        let info = if cend < 0 {
            pos -= cend;
            if right.len % 2 == 0 && right.len / 2 == -cend {
                kind = VariationKind::TandemDuplication;
            }
            Info::exact()
        } else {
            Info::exact().cpos(-cend).cend(cend)
        };
        self.variation(kind, pair, pos, right.end, info)
    }

    fn enclose(&self, pair: &SplitPair) -> Vec<Variation> {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let read = &pair.read;
        let max = self.window.max;
        if pair.read_first {
            let cpos = left.end - right.pos + left.len;
            let dup = self.variation(
                VariationKind::Duplication,
                pair,
                left.pos - 1,
                left.end,
                Info::exact().cpos(cpos).cend(-cpos),
            );
            let tracpos = right.pos - left.len - read.end - max;
            let target = Self::target(pair, left, Some(Slack::Bounded(tracpos)), None);
            let tra = self.translocation(pair, right.pos - 1, target);
            vec![dup, tra]
        } else {
            let cend = right.pos - left.end - right.len;
            let dup = self.variation(
                VariationKind::Duplication,
                pair,
                right.pos - 1,
                right.end,
                Info::exact().cpos(-cend).cend(cend),
            );
            let tracend = max - (read.pos - left.end - right.len);
            let target = Self::target(pair, right, None, Some(Slack::Bounded(tracend)));
            let tra = self.translocation(pair, left.end - 1, target);
            vec![dup, tra]
        }
    }

    fn enclose_rearranged(&self, pair: &SplitPair) -> Vec<Variation> {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let read = &pair.read;
        if pair.read_first {
            let cend = right.end - left.end;
            let dup = self.variation(
                VariationKind::Duplication,
                pair,
                left.pos - 1,
                left.end,
                Info::exact().cpos(-cend).cend(cend),
            );
            let target =
                Self::target(pair, left, None, Some(Slack::Bounded(read.pos - left.end)));
            let tra = self.translocation(pair, right.end - 1, target);
            vec![dup, tra]
        } else {
            let pos = right.pos - 1;
            let cpos = left.end - pos;
            let dup = self.variation(
                VariationKind::Duplication,
                pair,
                pos,
                right.end,
                Info::exact().cpos(cpos).cend(-cpos),
            );
            let target =
                Self::target(pair, right, Some(Slack::Bounded(read.end - right.pos + 1)), None);
            let tra = self.translocation(pair, left.pos - 1, target);
            vec![dup, tra]
        }
    }

    fn translocation(&self, pair: &SplitPair, pos: i64, target: Target) -> Variation {
        let info = Info::exact().target(target);
        self.variation(VariationKind::Translocation, pair, pos, pos, info)
    }

    /// `R` copied in after `L`. Unbounded to the right when the mate precedes the split.
    fn left_translocation(&self, pair: &SplitPair) -> Variation {
        let right = &pair.split.right;
        let tracend =
            if pair.read_first { Slack::Open } else { Slack::Bounded(pair.read.pos - right.end) };
        let target = Self::target(pair, right, None, Some(tracend));
        self.translocation(pair, pair.split.left.end - 1, target)
    }

    /// `L` copied in before `R`. Unbounded to the left when the mate follows the split.
    fn right_translocation(&self, pair: &SplitPair) -> Variation {
        let left = &pair.split.left;
        let tracpos =
            if pair.read_first { Slack::Bounded(pair.read.end - left.pos) } else { Slack::Open };
        let target = Self::target(pair, left, Some(tracpos), None);
        self.translocation(pair, pair.split.right.pos - 1, target)
    }

    fn left_translocation_rearranged(&self, pair: &SplitPair) -> Variation {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let target = Self::target(pair, left, None, Some(Slack::Bounded(right.pos - left.end)));
        self.translocation(pair, right.end - 1, target)
    }

    fn right_translocation_rearranged(&self, pair: &SplitPair) -> Variation {
        let (left, right) = (&pair.split.left, &pair.split.right);
        let target = Self::target(pair, right, Some(Slack::Bounded(left.end - right.pos)), None);
        self.translocation(pair, left.pos - 1, target)
    }
}
