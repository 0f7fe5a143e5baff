//! Joining two corroborating variations into one.
//!
//! A join is only defined between kinds that can describe the same event and only when
//! the operands' maximal spans overlap. Each breakpoint is narrowed independently: when
//! the two confidence intervals of a breakpoint intersect, the result keeps the
//! intersection; when they do not, the breakpoint collapses onto the tightest bound both
//! operands allow and becomes exact. Joined variations are therefore never wider than
//! either operand and repeated joins drive imprecise calls toward precise ones.

use super::info::{Info, LengthRange, Slack, Target};
use super::{EvidenceMethod, Variation, VariationKind};

/// How the locus of a joined variation is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Start and end are narrowed separately.
    Boundary,
    /// A single insertion point.
    Point,
    /// A single insertion point plus a target locus.
    Translocation,
}

/// Result kind and shape for a pair of operand kinds, `None` when they never join.
fn join_kind(a: VariationKind, b: VariationKind) -> Option<(VariationKind, Shape)> {
    use VariationKind::{
        Deletion, Duplication, Insertion, Inversion, TandemDuplication, Translocation,
    };
    match (a, b) {
        (Deletion, Deletion) => Some((Deletion, Shape::Boundary)),
        (Inversion, Inversion) => Some((Inversion, Shape::Boundary)),
        (Duplication, Duplication) => Some((Duplication, Shape::Boundary)),
        (Duplication | TandemDuplication, Duplication | TandemDuplication) => {
            Some((TandemDuplication, Shape::Boundary))
        }
        (Insertion, Insertion) => Some((Insertion, Shape::Point)),
        (Translocation, Translocation) | (Insertion, Translocation) | (Translocation, Insertion) => {
            Some((Translocation, Shape::Translocation))
        }
        _ => None,
    }
}

/// True when the kinds of `a` and `b` may ever join.
#[must_use]
pub fn compatible(a: VariationKind, b: VariationKind) -> bool {
    join_kind(a, b).is_some()
}

/// Narrows the start breakpoint. Returns the new start and its `cpos`.
fn narrow_start(a_start: i64, a_max: i64, b_start: i64, b_max: i64) -> (i64, Option<i64>) {
    let lo = a_max.max(b_max);
    let hi = a_start.min(b_start);
    if lo <= hi { (hi, Some(lo - hi)) } else { (lo, None) }
}

/// Narrows the end breakpoint. Returns the new end and its `cend`.
fn narrow_end(a_end: i64, a_max: i64, b_end: i64, b_max: i64) -> (i64, Option<i64>) {
    let lo = a_end.max(b_end);
    let hi = a_max.min(b_max);
    if lo <= hi { (lo, Some(hi - lo)) } else { (hi, None) }
}

fn spans_overlap(a: (Option<i64>, Option<i64>), b: (Option<i64>, Option<i64>)) -> bool {
    let before = |end: Option<i64>, start: Option<i64>| matches!((end, start), (Some(e), Some(s)) if e < s);
    !before(a.1, b.0) && !before(b.1, a.0)
}

/// Narrows two target loci, or `None` when they cannot describe the same sequence.
fn join_targets(a: &Target, b: &Target) -> Option<Target> {
    if a.reference != b.reference
        || !spans_overlap((a.max_start(), a.max_end()), (b.max_start(), b.max_end()))
    {
        return None;
    }

    let hi = a.pos.min(b.pos);
    let (pos, cpos) = match (a.max_start(), b.max_start()) {
        (None, None) => (hi, Some(Slack::Open)),
        (x, y) => {
            let lo = x.max(y).unwrap_or(hi);
            if lo <= hi { (hi, Some(Slack::Bounded(lo - hi))) } else { (lo, None) }
        }
    };

    let lo = a.end.max(b.end);
    let (end, cend) = match (a.max_end(), b.max_end()) {
        (None, None) => (lo, Some(Slack::Open)),
        (x, y) => {
            let hi = match (x, y) {
                (Some(x), Some(y)) => x.min(y),
                (x, y) => x.or(y).unwrap_or(lo),
            };
            if lo <= hi { (lo, Some(Slack::Bounded(hi - lo))) } else { (hi, None) }
        }
    };

    Some(Target { reference: a.reference, pos, end: end.max(pos), cpos, cend })
}

fn intersect_lengths(a: Option<LengthRange>, b: Option<LengthRange>) -> Option<LengthRange> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.intersect(b)),
        (a, b) => a.or(b),
    }
}

/// Joins two variations into one, or returns `None` when they are incompatible.
///
/// The operation is symmetric: operands are ordered by start before anything else.
#[must_use]
pub fn join(a: &Variation, b: &Variation) -> Option<Variation> {
    if a.reference != b.reference {
        return None;
    }
    let (kind, shape) = join_kind(a.kind, b.kind)?;
    if a.max_start() > b.max_end() || b.max_start() > a.max_end() {
        return None;
    }
    let (first, second) = if b.start < a.start { (b, a) } else { (a, b) };

    let (start, cpos) = narrow_start(first.start, first.max_start(), second.start, second.max_start());
    let mut info = Info::exact();
    info.cpos = cpos;
    info.depth = first.info.depth + second.info.depth;

    let end = match shape {
        Shape::Boundary => {
            let (end, cend) =
                narrow_end(first.end, first.max_end(), second.end, second.max_end());
            info.cend = cend;
            let length = if kind == VariationKind::Deletion && cpos.is_none() && cend.is_none() {
                Some(LengthRange::exact(end - start))
            } else {
                intersect_lengths(first.info.length_range(), second.info.length_range())
            };
            info.cilen = length;
            end
        }
        Shape::Point => {
            info.cilen = intersect_lengths(first.info.length_range(), second.info.length_range());
            start
        }
        Shape::Translocation => {
            let target = match (&first.info.target, &second.info.target) {
                (Some(x), Some(y)) => join_targets(x, y)?,
                (Some(t), None) | (None, Some(t)) => t.clone(),
                (None, None) => return None,
            };
            let mut length =
                intersect_lengths(first.info.length_range(), second.info.length_range());
            if first.kind != second.kind {
                length = intersect_lengths(length, Some(target.length_range()));
            }
            info.cilen = length;
            info.target = Some(target);
            start
        }
    };
    info.normalize(start);

    let ref_seq = if second.start == start && first.start != start {
        second.ref_seq.clone()
    } else {
        first.ref_seq.clone()
    };

    Some(Variation {
        kind,
        reference: first.reference,
        start,
        end: end.max(start),
        ref_seq,
        alt_seq: String::new(),
        method: EvidenceMethod::Joined,
        info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sv(kind: VariationKind, start: i64, end: i64, info: Info) -> Variation {
        Variation::structural(kind, 0, start, end, b'A', EvidenceMethod::ReadPair, info)
    }

    fn del(start: i64, end: i64) -> Variation {
        sv(VariationKind::Deletion, start, end, Info::exact().svlen(end - start))
    }

    fn width_left(v: &Variation) -> i64 {
        v.start - v.max_start()
    }

    fn width_right(v: &Variation) -> i64 {
        v.max_end() - v.end
    }

    #[test]
    fn test_overlapping_exact_deletions() {
        let joined = join(&del(100, 150), &del(120, 160)).expect("deletions overlap");
        assert_eq!(joined.kind, VariationKind::Deletion);
        assert_eq!((joined.start, joined.end), (120, 150));
        assert_eq!(joined.info.svlen, Some(30));
        assert_eq!(joined.depth(), 2);
        assert!(!joined.is_imprecise());
        assert_eq!(joined.method, EvidenceMethod::Joined);
    }

    #[test]
    fn test_imprecise_deletions_keep_intersection() {
        let a = sv(VariationKind::Deletion, 100, 150, Info::exact().cpos(-40).cend(30));
        let b = sv(VariationKind::Deletion, 90, 170, Info::exact().cpos(-20).cend(20));
        let joined = join(&a, &b).expect("deletions overlap");
        assert_eq!((joined.start, joined.info.cpos), (90, Some(-20)));
        assert_eq!((joined.end, joined.info.cend), (170, Some(10)));
        assert!(joined.is_imprecise());
    }

    #[test]
    fn test_confidence_collapses_to_exact() {
        let a = sv(VariationKind::Inversion, 100, 200, Info::exact().cpos(-10));
        let b = sv(VariationKind::Inversion, 90, 200, Info::exact());
        let joined = join(&a, &b).expect("inversions overlap");
        assert_eq!(joined.start, 90);
        assert_eq!(joined.info.cpos, None);
        assert!(!joined.is_imprecise());
    }

    #[rstest]
    #[case(VariationKind::Deletion, VariationKind::Insertion)]
    #[case(VariationKind::Deletion, VariationKind::Duplication)]
    #[case(VariationKind::Inversion, VariationKind::Duplication)]
    #[case(VariationKind::Snp, VariationKind::Snp)]
    #[case(VariationKind::Insertion, VariationKind::Duplication)]
    fn test_incompatible_kinds(#[case] a: VariationKind, #[case] b: VariationKind) {
        assert!(!compatible(a, b));
        assert!(!compatible(b, a));
        assert!(join(&sv(a, 100, 150, Info::exact()), &sv(b, 100, 150, Info::exact())).is_none());
    }

    #[test]
    fn test_adjacent_spans_do_not_join() {
        assert!(join(&del(100, 150), &del(151, 160)).is_none());
        assert!(join(&del(100, 150), &del(150, 160)).is_some());
    }

    #[test]
    fn test_other_reference_does_not_join() {
        let mut b = del(100, 150);
        b.reference = 1;
        assert!(join(&del(100, 150), &b).is_none());
    }

    #[test]
    fn test_duplication_with_tandem_is_tandem() {
        let a = sv(VariationKind::Duplication, 100, 200, Info::exact().cend(20));
        let b = sv(VariationKind::TandemDuplication, 100, 210, Info::exact());
        let joined = join(&a, &b).expect("duplications overlap");
        assert_eq!(joined.kind, VariationKind::TandemDuplication);
        assert_eq!(join(&b, &a), Some(joined));
    }

    #[test]
    fn test_insertions_narrow_length() {
        let a = sv(VariationKind::Insertion, 100, 100, Info::exact().cpos(-50).cilen(LengthRange::new(10, 60)));
        let b = sv(VariationKind::Insertion, 80, 80, Info::exact().cilen(LengthRange::new(40, 90)));
        let joined = join(&a, &b).expect("insertions overlap");
        assert_eq!((joined.start, joined.end), (80, 80));
        assert_eq!(joined.info.cpos, None);
        assert_eq!(joined.info.cilen, Some(LengthRange::new(40, 60)));
    }

    #[test]
    fn test_insertion_with_translocation() {
        let target =
            Target::new(1, 1000, 1100).with_confidence(Slack::Bounded(-10), Slack::Bounded(50));
        let tra = sv(VariationKind::Translocation, 100, 100, Info::exact().cpos(-30).target(target));
        let ins = sv(VariationKind::Insertion, 90, 90, Info::exact().cilen(LengthRange::at_least(120)));
        let joined = join(&ins, &tra).expect("insertion overlaps translocation");
        assert_eq!(joined.kind, VariationKind::Translocation);
        assert_eq!(joined.start, 90);
        assert_eq!(joined.info.cilen, Some(LengthRange::new(120, 160)));
        assert_eq!(joined.info.target.as_ref().map(|t| t.reference), Some(1));
        assert_eq!(join(&tra, &ins), Some(joined));
    }

    #[test]
    fn test_translocation_targets() {
        let t1 = Target::new(1, 1000, 1100).with_confidence(Slack::Open, Slack::Bounded(50));
        let t2 = Target::new(1, 980, 1120).with_confidence(Slack::Bounded(-30), Slack::Open);
        let a = sv(VariationKind::Translocation, 100, 100, Info::exact().target(t1));
        let b = sv(VariationKind::Translocation, 100, 100, Info::exact().target(t2));
        let joined = join(&a, &b).expect("targets overlap");
        let target = joined.info.target.expect("target");
        assert_eq!((target.pos, target.cpos), (980, Some(Slack::Bounded(-30))));
        assert_eq!((target.end, target.cend), (1120, Some(Slack::Bounded(30))));

        let t3 = Target::new(2, 1000, 1100);
        let c = sv(VariationKind::Translocation, 100, 100, Info::exact().target(t3));
        assert!(join(&a, &c).is_none());
    }

    #[test]
    fn test_open_target_stays_open_only_when_both_open() {
        let t1 = Target::new(1, 1000, 1100).with_confidence(Slack::Open, Slack::Open);
        let t2 = Target::new(1, 1010, 1090).with_confidence(Slack::Open, Slack::Bounded(40));
        let a = sv(VariationKind::Translocation, 100, 100, Info::exact().target(t1));
        let b = sv(VariationKind::Translocation, 100, 100, Info::exact().target(t2));
        let target = join(&a, &b).and_then(|v| v.info.target).expect("target");
        assert_eq!((target.pos, target.cpos), (1000, Some(Slack::Open)));
        assert_eq!((target.end, target.cend), (1100, Some(Slack::Bounded(30))));
    }

    #[rstest]
    #[case(del(100, 150), del(120, 160))]
    #[case(
        sv(VariationKind::Deletion, 100, 150, Info::exact().cpos(-40).cend(30)),
        sv(VariationKind::Deletion, 90, 170, Info::exact().cpos(-20).cend(20))
    )]
    #[case(
        sv(VariationKind::Duplication, 300, 400, Info::exact().cpos(-100).cend(100)),
        sv(VariationKind::Duplication, 250, 480, Info::exact().cpos(-10).cend(5))
    )]
    #[case(
        sv(VariationKind::Inversion, 10, 90, Info::exact().cend(200)),
        sv(VariationKind::Inversion, 50, 300, Info::exact().cpos(-60))
    )]
    #[case(
        sv(VariationKind::Insertion, 100, 100, Info::exact().cpos(-400)),
        sv(VariationKind::Insertion, 100, 100, Info::exact().cpos(-200))
    )]
    fn test_join_is_commutative_and_narrowing(#[case] a: Variation, #[case] b: Variation) {
        let ab = join(&a, &b).expect("operands join");
        let ba = join(&b, &a).expect("operands join");
        assert_eq!(ab, ba);
        assert!(ab.start <= ab.end);
        assert!(width_left(&ab) <= width_left(&a).min(width_left(&b)));
        assert!(width_right(&ab) <= width_right(&a).min(width_right(&b)));
        assert_eq!(ab.depth(), a.depth() + b.depth());
    }
}
