//! Structural hypotheses from the geometry of a normal read pair.
//!
//! A pair is abnormal when its reads face the wrong way or its inner distance falls
//! outside the sample's insert window. Every abnormality has several explanations; each
//! one becomes a variation whose confidence offsets cover every placement of the event that
//! the insert window allows. The primary read is on the left (`read`) and its mate on the
//! right.

use super::{Hypotheses, InsertWindow};
use crate::pairs::{ClassifiedPair, PairKind};
use crate::reference::ReferenceReader;
use crate::sam::AlignedRead;
use crate::variation::{EvidenceMethod, Info, LengthRange, Slack, Target, Variation, VariationKind};

/// Builds hypotheses from normal pairs.
#[derive(Debug, Clone, Copy)]
pub struct PairFactory<'a> {
    reference: &'a ReferenceReader,
    window: InsertWindow,
}

/// The two reads of a normal pair and their measurements.
struct Geometry<'p> {
    read: &'p AlignedRead,
    mate: &'p AlignedRead,
    actual: i64,
    read_inverted: bool,
    mate_inverted: bool,
}

impl<'a> PairFactory<'a> {
    #[must_use]
    pub fn new(reference: &'a ReferenceReader, window: InsertWindow) -> Self {
        Self { reference, window }
    }

    /// Hypotheses explaining `pair`, or `None` when it is unremarkable or not a normal pair.
    #[must_use]
    pub fn hypotheses(&self, pair: &ClassifiedPair) -> Option<Hypotheses> {
        if pair.kind != PairKind::Normal {
            return None;
        }
        let mate = pair.mate.as_ref()?;
        let g = Geometry {
            read: &pair.read,
            mate,
            actual: pair.actual_size(),
            read_inverted: pair.read_inverted(),
            mate_inverted: pair.mate_inverted(),
        };
        let rearranged = pair.is_rearranged();
        let interchromosomal = pair.is_interchromosomal();
        let overlap = pair.has_overlap();

        let hypotheses = if rearranged && interchromosomal {
            Hypotheses::Group(vec![
                self.left_translocation_rearranged(&g),
                self.right_translocation_rearranged(&g),
            ])
        } else if rearranged && overlap {
            Hypotheses::Single(self.overlap_rearranged(&g))
        } else if rearranged {
            Hypotheses::Group(vec![
                self.left_translocation_rearranged(&g),
                self.right_translocation_rearranged(&g),
                self.left_duplication_rearranged(&g),
                self.right_duplication_rearranged(&g),
            ])
        } else if interchromosomal {
            if g.read_inverted || g.mate_inverted {
                return None;
            }
            Hypotheses::Group(vec![self.left_translocation(&g), self.right_translocation(&g)])
        } else if g.read_inverted {
            Hypotheses::Single(self.inversion_read(&g))
        } else if g.mate_inverted {
            Hypotheses::Single(self.inversion_mate(&g))
        } else if overlap {
            Hypotheses::Single(self.overlap(&g))
        } else if g.actual < self.window.min {
            Hypotheses::Group(vec![
                self.insertion(&g),
                self.left_translocation(&g),
                self.right_translocation(&g),
                self.left_small_duplication(&g),
                self.right_small_duplication(&g),
            ])
        } else if g.actual > self.window.max {
            Hypotheses::Group(vec![
                self.deletion(&g),
                self.left_translocation(&g),
                self.right_translocation(&g),
                self.left_big_duplication(&g),
                self.right_big_duplication(&g),
            ])
        } else {
            return None;
        };
        Some(hypotheses)
    }

    fn variation(
        &self,
        kind: VariationKind,
        reference: usize,
        pos: i64,
        end: i64,
        info: Info,
    ) -> Variation {
        Variation::structural(
            kind,
            reference,
            pos,
            end,
            self.reference.base_at(reference, pos),
            EvidenceMethod::ReadPair,
            info,
        )
    }

    /// Bases between the end of `read` and the end of its reference.
    fn tail(&self, read: &AlignedRead) -> i64 {
        self.reference.reference_length(read.reference) - read.end
    }

    /// `plus_end` widens an overlap duplication that ends with the mate.
    fn plus_end(g: &Geometry<'_>, end: i64) -> i64 {
        if end == g.mate.end { g.read.end - g.mate.end } else { 0 }
    }

    fn insertion(&self, g: &Geometry<'_>) -> Variation {
        let (min, max) = (self.window.min, self.window.max);
        let info = Info::exact()
            .cilen(LengthRange::new(min - g.actual, max - g.actual))
            .cpos(-g.actual);
        self.variation(VariationKind::Insertion, g.read.reference, g.mate.pos - 1, 0, info)
    }

    fn deletion(&self, g: &Geometry<'_>) -> Variation {
        let (min, max) = (self.window.min, self.window.max);
        let info = Info::exact()
            .cilen(LengthRange::new(g.actual - max, g.actual - min))
            .cpos(-max);
        let pos = g.read.end + max - 1;
        self.variation(VariationKind::Deletion, g.read.reference, pos, g.mate.pos - 1, info)
    }

    fn inversion_read(&self, g: &Geometry<'_>) -> Variation {
        let info = Info::exact().cpos(-self.window.max).cend(g.actual);
        self.variation(VariationKind::Inversion, g.read.reference, g.read.pos, g.read.end, info)
    }

    fn inversion_mate(&self, g: &Geometry<'_>) -> Variation {
        let info = Info::exact().cpos(-g.actual).cend(self.window.max);
        self.variation(VariationKind::Inversion, g.mate.reference, g.mate.pos, g.mate.end, info)
    }

    fn overlap(&self, g: &Geometry<'_>) -> Variation {
        let max = self.window.max;
        let end = g.read.end.min(g.mate.end);
        let info = Info::exact().cpos(-max).cend(max + Self::plus_end(g, end));
        self.variation(VariationKind::Duplication, g.read.reference, g.mate.pos - 1, end, info)
    }

    fn overlap_rearranged(&self, g: &Geometry<'_>) -> Variation {
        let end = g.read.end.min(g.mate.end);
        let cpos = -(g.mate.end - g.read.pos + g.actual + self.window.max);
        let info = Info::exact().cpos(cpos).cend(-cpos + Self::plus_end(g, end));
        self.variation(VariationKind::Duplication, g.mate.reference, g.mate.pos - 1, end, info)
    }

    fn right_small_duplication(&self, g: &Geometry<'_>) -> Variation {
        let (min, max) = (self.window.min, self.window.max);
        let overlap = g.actual + g.mate.span() - min > 0;
        let end = if overlap { g.read.end + min } else { g.mate.end };
        let cend = g.read.end + max - end;
        let info = Info::exact().cpos(-cend).cend(cend);
        self.variation(VariationKind::Duplication, g.read.reference, g.mate.pos - 1, end, info)
    }

    fn left_small_duplication(&self, g: &Geometry<'_>) -> Variation {
        let (min, max) = (self.window.min, self.window.max);
        let overlap = g.actual + g.read.span() - min > 0;
        let pos = (if overlap { g.mate.pos - min } else { g.read.pos }) - 1;
        let cpos = g.mate.pos - max - pos;
        let info = Info::exact().cpos(cpos).cend(-cpos);
        self.variation(VariationKind::Duplication, g.mate.reference, pos, g.read.end, info)
    }

    fn right_big_duplication(&self, g: &Geometry<'_>) -> Variation {
        let (min, max) = (self.window.min, self.window.max);
        let overlap = max + g.mate.span() - g.actual < 0;
        let pos = (if overlap { g.read.end + max + g.mate.span() } else { g.mate.pos }) - 1;
        let cpos = g.read.end + min + g.mate.span() - pos;
        let info = Info::exact().cpos(cpos).cend(-cpos);
        self.variation(VariationKind::Duplication, g.read.reference, pos, g.mate.end, info)
    }

    fn left_big_duplication(&self, g: &Geometry<'_>) -> Variation {
        let (min, max) = (self.window.min, self.window.max);
        let overlap = g.actual - (max + g.read.span()) < 0;
        let end = if overlap { g.mate.pos - max - g.read.span() } else { g.read.end };
        let cend = g.mate.pos - min - g.read.span() - end;
        let info = Info::exact().cpos(-cend).cend(cend);
        self.variation(VariationKind::Duplication, g.mate.reference, g.read.pos - 1, end, info)
    }

    fn right_duplication_rearranged(&self, g: &Geometry<'_>) -> Variation {
        let cpos = g.actual + g.mate.span() - self.window.max;
        let info = Info::exact().cpos(cpos).cend(-cpos);
        let pos = g.mate.pos - 1;
        self.variation(VariationKind::Duplication, g.read.reference, pos, g.mate.end, info)
    }

    fn left_duplication_rearranged(&self, g: &Geometry<'_>) -> Variation {
        let cpos = g.actual + g.read.span() - self.window.max;
        let info = Info::exact().cpos(cpos).cend(-g.actual);
        let pos = g.read.pos - 1;
        self.variation(VariationKind::Duplication, g.mate.reference, pos, g.read.end, info)
    }

    /// The target locus covered by `read`.
    fn target(read: &AlignedRead, cpos: i64, cend: i64) -> Target {
        Target::new(read.reference, read.pos, read.end - 1)
            .with_confidence(Slack::Bounded(cpos), Slack::Bounded(cend))
    }

    /// The mate's sequence inserted to the right of the read.
    fn right_translocation(&self, g: &Geometry<'_>) -> Variation {
        let max = self.window.max;
        let target = if g.mate_inverted {
            Self::target(g.mate, -g.mate.pos, max)
        } else {
            Self::target(g.mate, -max, self.tail(g.mate))
        };
        let info = Info::exact().cpos(-max.min(g.actual)).target(target);
        let pos = g.read.end + max - 1;
        self.variation(VariationKind::Translocation, g.read.reference, pos, pos, info)
    }

    /// The read's sequence inserted to the left of the mate.
    fn left_translocation(&self, g: &Geometry<'_>) -> Variation {
        let max = self.window.max;
        let target = if g.read_inverted {
            Self::target(g.read, -max, self.tail(g.read))
        } else {
            Self::target(g.read, -g.read.pos, max)
        };
        let info = Info::exact().cpos(-max.min(g.actual)).target(target);
        let pos = g.mate.pos - 1;
        self.variation(VariationKind::Translocation, g.mate.reference, pos, pos, info)
    }

    fn right_translocation_rearranged(&self, g: &Geometry<'_>) -> Variation {
        let max = self.window.max;
        let target = Self::target(g.mate, g.actual, max);
        let info = Info::exact().cpos(-max).target(target);
        let pos = g.read.pos - 1;
        self.variation(VariationKind::Translocation, g.read.reference, pos, pos, info)
    }

    fn left_translocation_rearranged(&self, g: &Geometry<'_>) -> Variation {
        let max = self.window.max;
        let target = Self::target(g.read, -max, -g.actual);
        let info = Info::exact().cpos(-max).target(target);
        let pos = g.mate.end + max - 1;
        self.variation(VariationKind::Translocation, g.mate.reference, pos, pos, info)
    }
}
