//! A decoded view of one mapped alignment record.
//!
//! Detection works on plain 0-based coordinates and owned CIGAR operations, so records are
//! converted once, as they come off the reader, into an [`AlignedRead`].

use crate::sam::record_utils::{cigar_reference_length, has_gaps, has_soft_clip};
use anyhow::Result;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record_buf::RecordBuf;
use noodles::sam::alignment::record_buf::data::field::Value as BufValue;

/// The MD tag.
pub const EDIT_TAG: Tag = Tag::new(b'M', b'D');

/// A mapped read with 0-based coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AlignedRead {
    pub name: Vec<u8>,
    /// Reference id.
    pub reference: usize,
    /// First aligned reference position (0-based).
    pub pos: i64,
    /// One past the last aligned reference position.
    pub end: i64,
    /// Mapping quality, 0 when absent.
    pub mapq: u8,
    pub is_reverse: bool,
    pub is_duplicate: bool,
    pub is_paired: bool,
    pub is_first_segment: bool,
    pub mate_unmapped: bool,
    pub mate_reference: Option<usize>,
    /// Mate alignment start (0-based).
    pub mate_pos: Option<i64>,
    pub template_length: i64,
    pub cigar: Vec<(Kind, usize)>,
    pub sequence: Vec<u8>,
    /// Raw MD tag value.
    pub edit_tag: Option<String>,
}

impl AlignedRead {
    /// Decodes a record, returning `None` for records that take no part in detection:
    /// unmapped, secondary and supplementary alignments.
    ///
    /// # Errors
    /// Returns an error if a coordinate does not fit the 0-based signed range.
    pub fn from_record(record: &RecordBuf) -> Result<Option<Self>> {
        let flags = record.flags();
        if flags.is_unmapped() || flags.is_secondary() || flags.is_supplementary() {
            return Ok(None);
        }
        let (Some(reference), Some(start)) =
            (record.reference_sequence_id(), record.alignment_start())
        else {
            return Ok(None);
        };

        let cigar: Vec<(Kind, usize)> =
            record.cigar().as_ref().iter().map(|op| (op.kind(), op.len())).collect();
        let pos = i64::try_from(usize::from(start))? - 1;
        let end = pos + i64::try_from(cigar_reference_length(&cigar))?;

        let mate_pos = match record.mate_alignment_start() {
            Some(p) => Some(i64::try_from(usize::from(p))? - 1),
            None => None,
        };

        let edit_tag = match record.data().get(&EDIT_TAG) {
            Some(BufValue::String(s)) => Some(s.to_string()),
            _ => None,
        };

        Ok(Some(Self {
            name: record.name().map(|n| n.to_vec()).unwrap_or_default(),
            reference,
            pos,
            end,
            mapq: record.mapping_quality().map_or(0, |q| q.get()),
            is_reverse: flags.is_reverse_complemented(),
            is_duplicate: flags.is_duplicate(),
            is_paired: flags.is_segmented(),
            is_first_segment: flags.is_first_segment(),
            mate_unmapped: flags.contains(Flags::MATE_UNMAPPED),
            mate_reference: record.mate_reference_sequence_id(),
            mate_pos,
            template_length: i64::from(record.template_length()),
            cigar,
            sequence: record.sequence().as_ref().to_vec(),
            edit_tag,
        }))
    }

    /// Query length in bases.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn len(&self) -> i64 {
        self.sequence.len() as i64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Reference bases covered by the alignment.
    #[must_use]
    pub fn span(&self) -> i64 {
        self.end - self.pos
    }

    #[must_use]
    pub fn has_soft_clip(&self) -> bool {
        has_soft_clip(&self.cigar)
    }

    #[must_use]
    pub fn has_gaps(&self) -> bool {
        has_gaps(&self.cigar)
    }

    /// True when the mate is expected to be a mapped alignment.
    #[must_use]
    pub fn has_mapped_mate(&self) -> bool {
        self.is_paired && !self.mate_unmapped && self.mate_reference.is_some()
    }

    /// The read name as UTF-8, lossily.
    #[must_use]
    pub fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sam::builder::RecordBuilder;

    #[test]
    fn test_from_record_coordinates() -> Result<()> {
        let record = RecordBuilder::mapped_read()
            .name("r1")
            .alignment_start(101)
            .cigar("5S10M2D10M")
            .tag("MD", "10^AC10")
            .build();
        let read = AlignedRead::from_record(&record)?.expect("mapped read");

        assert_eq!(read.pos, 100);
        assert_eq!(read.end, 122);
        assert_eq!(read.len(), 25);
        assert_eq!(read.mapq, 60);
        assert_eq!(read.edit_tag.as_deref(), Some("10^AC10"));
        assert!(read.has_soft_clip());
        assert!(read.has_gaps());
        Ok(())
    }

    #[test]
    fn test_skips_secondary_and_unmapped() -> Result<()> {
        let secondary =
            RecordBuilder::mapped_read().alignment_start(1).cigar("10M").secondary(true).build();
        let supplementary =
            RecordBuilder::mapped_read().alignment_start(1).cigar("10M").supplementary(true).build();
        let unmapped = RecordBuilder::new().sequence("ACGT").unmapped(true).build();
        assert!(AlignedRead::from_record(&secondary)?.is_none());
        assert!(AlignedRead::from_record(&supplementary)?.is_none());
        assert!(AlignedRead::from_record(&unmapped)?.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_mapq_is_zero() -> Result<()> {
        let record =
            RecordBuilder::mapped_read().alignment_start(1).cigar("10M").no_mapping_quality().build();
        let read = AlignedRead::from_record(&record)?.expect("mapped read");
        assert_eq!(read.mapq, 0);
        assert!(read.edit_tag.is_none());
        Ok(())
    }

    #[test]
    fn test_mate_fields() -> Result<()> {
        let record = RecordBuilder::mapped_read()
            .alignment_start(1)
            .cigar("10M")
            .first_segment(true)
            .mate_reference_sequence_id(0)
            .mate_alignment_start(301)
            .template_length(310)
            .build();
        let read = AlignedRead::from_record(&record)?.expect("mapped read");
        assert!(read.has_mapped_mate());
        assert!(read.is_first_segment);
        assert_eq!(read.mate_pos, Some(300));
        assert_eq!(read.template_length, 310);
        Ok(())
    }

    #[test]
    fn test_unmapped_mate() -> Result<()> {
        let record = RecordBuilder::mapped_read()
            .alignment_start(1)
            .cigar("10M")
            .first_segment(true)
            .mate_reference_sequence_id(0)
            .mate_alignment_start(1)
            .mate_unmapped(true)
            .build();
        let read = AlignedRead::from_record(&record)?.expect("mapped read");
        assert!(!read.has_mapped_mate());
        Ok(())
    }
}
