//! CIGAR utilities over `(Kind, length)` operation lists.
//!
//! Alignment operations are carried around as plain `(Kind, usize)` pairs so that
//! records, split parts and realigned fragments can share the same helpers.

use noodles::sam::alignment::record::cigar::op::Kind;

/// Parses a CIGAR string and returns it as a vector of (Kind, length) operations.
///
/// Unknown operation characters and zero-length operations are skipped.
#[must_use]
pub fn parse_cigar_string(cigar_str: &str) -> Vec<(Kind, usize)> {
    let mut ops = Vec::new();
    let mut num_str = String::new();

    for ch in cigar_str.chars() {
        if ch.is_ascii_digit() {
            num_str.push(ch);
        } else {
            let len: usize = num_str.parse().unwrap_or(0);
            num_str.clear();

            let kind = match ch {
                'M' => Kind::Match,
                'I' => Kind::Insertion,
                'D' => Kind::Deletion,
                'N' => Kind::Skip,
                'S' => Kind::SoftClip,
                'H' => Kind::HardClip,
                'P' => Kind::Pad,
                '=' => Kind::SequenceMatch,
                'X' => Kind::SequenceMismatch,
                _ => continue,
            };

            if len > 0 {
                ops.push((kind, len));
            }
        }
    }

    ops
}

/// Renders operations back into a CIGAR string.
#[must_use]
pub fn format_cigar(ops: &[(Kind, usize)]) -> String {
    ops.iter()
        .map(|(kind, len)| {
            let ch = match kind {
                Kind::Match => 'M',
                Kind::Insertion => 'I',
                Kind::Deletion => 'D',
                Kind::Skip => 'N',
                Kind::SoftClip => 'S',
                Kind::HardClip => 'H',
                Kind::Pad => 'P',
                Kind::SequenceMatch => '=',
                Kind::SequenceMismatch => 'X',
            };
            format!("{len}{ch}")
        })
        .collect()
}

/// Calculates the reference length consumed by CIGAR operations.
#[must_use]
pub fn cigar_reference_length(ops: &[(Kind, usize)]) -> usize {
    ops.iter()
        .filter_map(|(kind, len)| match kind {
            Kind::Match
            | Kind::Deletion
            | Kind::Skip
            | Kind::SequenceMatch
            | Kind::SequenceMismatch => Some(*len),
            _ => None,
        })
        .sum()
}

/// Calculates leading soft clipping only from CIGAR operations.
#[must_use]
pub fn leading_soft_clipping(ops: &[(Kind, usize)]) -> usize {
    ops.iter()
        .skip_while(|(kind, _)| *kind == Kind::HardClip)
        .take_while(|(kind, _)| *kind == Kind::SoftClip)
        .map(|(_, len)| *len)
        .sum()
}

/// Calculates trailing soft clipping only from CIGAR operations.
#[must_use]
pub fn trailing_soft_clipping(ops: &[(Kind, usize)]) -> usize {
    ops.iter()
        .rev()
        .skip_while(|(kind, _)| *kind == Kind::HardClip)
        .take_while(|(kind, _)| *kind == Kind::SoftClip)
        .map(|(_, len)| *len)
        .sum()
}

/// True for operations that interrupt a contiguous alignment.
#[must_use]
pub fn is_gap(kind: Kind) -> bool {
    matches!(kind, Kind::Skip | Kind::SoftClip | Kind::HardClip | Kind::Pad)
}

/// True when any operation is a soft clip.
#[must_use]
pub fn has_soft_clip(ops: &[(Kind, usize)]) -> bool {
    ops.iter().any(|(kind, _)| *kind == Kind::SoftClip)
}

/// True when any operation is a gap (see [`is_gap`]).
#[must_use]
pub fn has_gaps(ops: &[(Kind, usize)]) -> bool {
    ops.iter().any(|(kind, _)| is_gap(*kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_and_format_cigar() {
        let ops = parse_cigar_string("5H10S20M2I3D15M");
        assert_eq!(
            ops,
            vec![
                (Kind::HardClip, 5),
                (Kind::SoftClip, 10),
                (Kind::Match, 20),
                (Kind::Insertion, 2),
                (Kind::Deletion, 3),
                (Kind::Match, 15),
            ]
        );
        assert_eq!(format_cigar(&ops), "5H10S20M2I3D15M");
    }

    #[test]
    fn test_parse_skips_zero_length() {
        assert_eq!(parse_cigar_string("0S10M"), vec![(Kind::Match, 10)]);
    }

    #[rstest]
    #[case("10M", 10)]
    #[case("10M2I10M", 20)]
    #[case("5S10M3D5M", 18)]
    #[case("10M100N10M", 120)]
    #[case("4=1X5=", 10)]
    fn test_reference_length(#[case] cigar: &str, #[case] expected: usize) {
        assert_eq!(cigar_reference_length(&parse_cigar_string(cigar)), expected);
    }

    #[rstest]
    #[case("5H10S20M", 10, 0)]
    #[case("20M7S3H", 0, 7)]
    #[case("3S20M4S", 3, 4)]
    #[case("20M", 0, 0)]
    fn test_soft_clipping(#[case] cigar: &str, #[case] lead: usize, #[case] trail: usize) {
        let ops = parse_cigar_string(cigar);
        assert_eq!(leading_soft_clipping(&ops), lead);
        assert_eq!(trailing_soft_clipping(&ops), trail);
    }

    #[test]
    fn test_gap_predicates() {
        assert!(has_soft_clip(&parse_cigar_string("10S20M")));
        assert!(!has_soft_clip(&parse_cigar_string("10H20M")));
        assert!(has_gaps(&parse_cigar_string("10H20M")));
        assert!(has_gaps(&parse_cigar_string("10M100N10M")));
        assert!(!has_gaps(&parse_cigar_string("10M2I3D10M")));
    }
}
