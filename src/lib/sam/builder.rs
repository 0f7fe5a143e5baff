//! Builders for test alignment records and indexed BAM files.
//!
//! [`RecordBuilder`] creates single records with sensible defaults, [`PairBuilder`] creates
//! two mates with consistent mate fields, and [`write_indexed_bam`] writes a
//! coordinate-sorted BAM together with its BAI index.
//!
//! ```rust
//! use gataca_lib::sam::builder::RecordBuilder;
//!
//! let record = RecordBuilder::mapped_read()
//!     .name("read1")
//!     .alignment_start(100)
//!     .cigar("10M")
//!     .build();
//! assert_eq!(record.reference_sequence_id(), Some(0));
//! ```

use crate::sam::record_utils::parse_cigar_string;
use anyhow::{Context, Result};
use bstr::BString;
use noodles::bam;
use noodles::core::Position;
use noodles::sam::Header;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::data::field::Tag;
use noodles::sam::alignment::record::{Flags, MappingQuality};
use noodles::sam::alignment::record_buf::data::field::Value as BufValue;
use noodles::sam::alignment::record_buf::{QualityScores, RecordBuf, Sequence};
use noodles::sam::header::record::value::Map;
use noodles::sam::header::record::value::map::header::tag as header_tag;
use noodles::sam::header::record::value::map::{self, ReferenceSequence};
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::Path;

pub const DEFAULT_BASE_QUALITY: u8 = 30;
pub const DEFAULT_MAPQ: u8 = 60;

/// Builds a coordinate-sorted header over `(name, length)` references.
///
/// # Panics
/// Panics if a length is zero.
#[must_use]
pub fn coordinate_sorted_header(references: &[(&str, usize)]) -> Header {
    let hd = Map::<map::Header>::builder()
        .insert(header_tag::SORT_ORDER, BString::from("coordinate"))
        .build()
        .expect("valid header map");
    let mut builder = Header::builder().set_header(hd);
    for (name, length) in references {
        let map = Map::<ReferenceSequence>::new(
            NonZeroUsize::new(*length).expect("reference length must be > 0"),
        );
        builder = builder.add_reference_sequence(BString::from(*name), map);
    }
    builder.build()
}

/// Sorts `records` by coordinate, writes them to `path` and writes the `.bai` next to it.
///
/// # Errors
/// Returns an error if either file cannot be written.
pub fn write_indexed_bam(path: &Path, header: &Header, mut records: Vec<RecordBuf>) -> Result<()> {
    records.sort_by_key(|r| (r.reference_sequence_id(), r.alignment_start()));

    // The writer flushes its final block when dropped.
    {
        let mut writer = bam::io::Writer::new(File::create(path)?);
        writer.write_header(header)?;
        for record in &records {
            writer.write_alignment_record(header, record)?;
        }
    }

    let index = bam::fs::index(path).with_context(|| format!("Failed to index {}", path.display()))?;
    let mut bai_path = path.as_os_str().to_owned();
    bai_path.push(".bai");
    let mut index_writer = bam::bai::io::Writer::new(File::create(&bai_path)?);
    index_writer.write_index(&index)?;
    Ok(())
}

/// Builder for a single record.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    name: Option<Vec<u8>>,
    flags: Flags,
    reference_sequence_id: Option<usize>,
    alignment_start: Option<usize>,
    mapping_quality: Option<u8>,
    cigar: Option<String>,
    sequence: Vec<u8>,
    tags: Vec<(Tag, BufValue)>,
    mate_reference_sequence_id: Option<usize>,
    mate_alignment_start: Option<usize>,
    template_length: Option<i32>,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            flags: Flags::empty(),
            reference_sequence_id: None,
            alignment_start: None,
            mapping_quality: Some(DEFAULT_MAPQ),
            cigar: None,
            sequence: Vec::new(),
            tags: Vec::new(),
            mate_reference_sequence_id: None,
            mate_alignment_start: None,
            template_length: None,
        }
    }

    /// A builder on reference 0 with mapping quality 60.
    #[must_use]
    pub fn mapped_read() -> Self {
        Self { reference_sequence_id: Some(0), ..Self::new() }
    }

    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.as_bytes().to_vec());
        self
    }

    #[must_use]
    pub fn sequence(mut self, seq: &str) -> Self {
        self.sequence = seq.as_bytes().to_vec();
        self
    }

    /// Sets the first segment flag (or the last segment flag when false). Implies paired.
    #[must_use]
    pub fn first_segment(mut self, is_first: bool) -> Self {
        self.flags.set(Flags::SEGMENTED, true);
        self.flags.set(Flags::FIRST_SEGMENT, is_first);
        self.flags.set(Flags::LAST_SEGMENT, !is_first);
        self
    }

    #[must_use]
    pub fn unmapped(mut self, unmapped: bool) -> Self {
        self.flags.set(Flags::UNMAPPED, unmapped);
        self
    }

    #[must_use]
    pub fn reverse_complement(mut self, reverse: bool) -> Self {
        self.flags.set(Flags::REVERSE_COMPLEMENTED, reverse);
        self
    }

    #[must_use]
    pub fn duplicate(mut self, duplicate: bool) -> Self {
        self.flags.set(Flags::DUPLICATE, duplicate);
        self
    }

    #[must_use]
    pub fn secondary(mut self, secondary: bool) -> Self {
        self.flags.set(Flags::SECONDARY, secondary);
        self
    }

    #[must_use]
    pub fn supplementary(mut self, supplementary: bool) -> Self {
        self.flags.set(Flags::SUPPLEMENTARY, supplementary);
        self
    }

    #[must_use]
    pub fn reference_sequence_id(mut self, id: usize) -> Self {
        self.reference_sequence_id = Some(id);
        self
    }

    /// Sets the alignment start position (1-based).
    #[must_use]
    pub fn alignment_start(mut self, pos: usize) -> Self {
        self.alignment_start = Some(pos);
        self
    }

    #[must_use]
    pub fn mapping_quality(mut self, mapq: u8) -> Self {
        self.mapping_quality = Some(mapq);
        self
    }

    /// Leaves the mapping quality unset (255 on disk).
    #[must_use]
    pub fn no_mapping_quality(mut self) -> Self {
        self.mapping_quality = None;
        self
    }

    #[must_use]
    pub fn cigar(mut self, cigar: &str) -> Self {
        self.cigar = Some(cigar.to_string());
        self
    }

    #[must_use]
    pub fn mate_reference_sequence_id(mut self, id: usize) -> Self {
        self.mate_reference_sequence_id = Some(id);
        self
    }

    /// Sets the mate alignment start position (1-based).
    #[must_use]
    pub fn mate_alignment_start(mut self, pos: usize) -> Self {
        self.mate_alignment_start = Some(pos);
        self
    }

    #[must_use]
    pub fn mate_reverse_complement(mut self, reverse: bool) -> Self {
        self.flags.set(Flags::MATE_REVERSE_COMPLEMENTED, reverse);
        self
    }

    #[must_use]
    pub fn mate_unmapped(mut self, unmapped: bool) -> Self {
        self.flags.set(Flags::MATE_UNMAPPED, unmapped);
        self
    }

    #[must_use]
    pub fn template_length(mut self, tlen: i32) -> Self {
        self.template_length = Some(tlen);
        self
    }

    /// Adds a string tag such as `MD`.
    #[must_use]
    pub fn tag(mut self, tag: &str, value: &str) -> Self {
        if let [a, b] = tag.as_bytes() {
            self.tags.push((Tag::new(*a, *b), BufValue::String(BString::from(value))));
        }
        self
    }

    /// Builds the record. A missing sequence is generated from the CIGAR's query length.
    ///
    /// # Panics
    /// Panics on a zero alignment start or an invalid mapping quality.
    #[must_use]
    pub fn build(self) -> RecordBuf {
        let mut record = RecordBuf::default();

        if let Some(name) = self.name {
            *record.name_mut() = Some(name.into());
        }
        *record.flags_mut() = self.flags;
        *record.reference_sequence_id_mut() = self.reference_sequence_id;
        if let Some(pos) = self.alignment_start {
            *record.alignment_start_mut() =
                Some(Position::try_from(pos).expect("alignment_start must be >= 1"));
        }
        *record.mate_reference_sequence_id_mut() = self.mate_reference_sequence_id;
        if let Some(pos) = self.mate_alignment_start {
            *record.mate_alignment_start_mut() =
                Some(Position::try_from(pos).expect("mate_alignment_start must be >= 1"));
        }
        if let Some(tlen) = self.template_length {
            *record.template_length_mut() = tlen;
        }
        *record.mapping_quality_mut() = self
            .mapping_quality
            .map(|q| MappingQuality::try_from(q).expect("mapping_quality must be valid"));

        let ops = self.cigar.as_deref().map(parse_cigar_string).unwrap_or_default();
        let sequence = if self.sequence.is_empty() {
            let query_len: usize = ops
                .iter()
                .filter(|(kind, _)| {
                    matches!(
                        kind,
                        Kind::Match
                            | Kind::Insertion
                            | Kind::SoftClip
                            | Kind::SequenceMatch
                            | Kind::SequenceMismatch
                    )
                })
                .map(|(_, len)| *len)
                .sum();
            (0..query_len).map(|i| b"ACGT"[i % 4]).collect()
        } else {
            self.sequence
        };
        let ops = if ops.is_empty() && !sequence.is_empty() && self.reference_sequence_id.is_some()
        {
            vec![(Kind::Match, sequence.len())]
        } else {
            ops
        };

        *record.cigar_mut() = ops.into_iter().map(|(kind, len)| Op::new(kind, len)).collect();
        *record.quality_scores_mut() = QualityScores::from(vec![DEFAULT_BASE_QUALITY; sequence.len()]);
        *record.sequence_mut() = Sequence::from(sequence);

        for (tag, value) in self.tags {
            record.data_mut().insert(tag, value);
        }
        record
    }
}

/// Builder for two mates on the same or different references.
///
/// Positions are 1-based. The template length is computed from the outer coordinates when
/// both mates share a reference.
#[derive(Debug, Clone)]
pub struct PairBuilder {
    name: String,
    r1: RecordBuilder,
    r2: RecordBuilder,
    r1_reference: usize,
    r2_reference: usize,
    r1_start: usize,
    r2_start: usize,
    r1_cigar: String,
    r2_cigar: String,
    r1_reverse: bool,
    r2_reverse: bool,
}

impl PairBuilder {
    /// A forward/reverse pair of 20bp reads named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            r1: RecordBuilder::new(),
            r2: RecordBuilder::new(),
            r1_reference: 0,
            r2_reference: 0,
            r1_start: 1,
            r2_start: 1,
            r1_cigar: "20M".to_string(),
            r2_cigar: "20M".to_string(),
            r1_reverse: false,
            r2_reverse: true,
        }
    }

    #[must_use]
    pub fn r1(mut self, reference: usize, start: usize, cigar: &str) -> Self {
        self.r1_reference = reference;
        self.r1_start = start;
        self.r1_cigar = cigar.to_string();
        self
    }

    #[must_use]
    pub fn r2(mut self, reference: usize, start: usize, cigar: &str) -> Self {
        self.r2_reference = reference;
        self.r2_start = start;
        self.r2_cigar = cigar.to_string();
        self
    }

    #[must_use]
    pub fn strands(mut self, r1_reverse: bool, r2_reverse: bool) -> Self {
        self.r1_reverse = r1_reverse;
        self.r2_reverse = r2_reverse;
        self
    }

    /// Applies extra settings to the first mate.
    #[must_use]
    pub fn with_r1(mut self, f: impl FnOnce(RecordBuilder) -> RecordBuilder) -> Self {
        self.r1 = f(self.r1);
        self
    }

    /// Applies extra settings to the second mate.
    #[must_use]
    pub fn with_r2(mut self, f: impl FnOnce(RecordBuilder) -> RecordBuilder) -> Self {
        self.r2 = f(self.r2);
        self
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn build(self) -> (RecordBuf, RecordBuf) {
        let r1_end = self.r1_start + reference_span(&self.r1_cigar);
        let r2_end = self.r2_start + reference_span(&self.r2_cigar);
        let tlen = if self.r1_reference == self.r2_reference {
            let outer = (r1_end.max(r2_end) - self.r1_start.min(self.r2_start)) as i32;
            if self.r1_start <= self.r2_start { outer } else { -outer }
        } else {
            0
        };

        let r1 = self
            .r1
            .name(&self.name)
            .first_segment(true)
            .reference_sequence_id(self.r1_reference)
            .alignment_start(self.r1_start)
            .cigar(&self.r1_cigar)
            .reverse_complement(self.r1_reverse)
            .mate_reference_sequence_id(self.r2_reference)
            .mate_alignment_start(self.r2_start)
            .mate_reverse_complement(self.r2_reverse)
            .template_length(tlen)
            .build();
        let r2 = self
            .r2
            .name(&self.name)
            .first_segment(false)
            .reference_sequence_id(self.r2_reference)
            .alignment_start(self.r2_start)
            .cigar(&self.r2_cigar)
            .reverse_complement(self.r2_reverse)
            .mate_reference_sequence_id(self.r1_reference)
            .mate_alignment_start(self.r1_start)
            .mate_reverse_complement(self.r1_reverse)
            .template_length(-tlen)
            .build();
        (r1, r2)
    }
}

fn reference_span(cigar: &str) -> usize {
    crate::sam::record_utils::cigar_reference_length(&parse_cigar_string(cigar))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_builder_template_length() {
        let (r1, r2) = PairBuilder::new("p").r1(0, 101, "20M").r2(0, 481, "20M").build();
        assert_eq!(r1.template_length(), 400);
        assert_eq!(r2.template_length(), -400);
        assert!(r1.flags().is_first_segment());
        assert!(r2.flags().is_last_segment());
        assert!(r2.flags().is_reverse_complemented());
        assert_eq!(r1.sequence().len(), 20);
    }

    #[test]
    fn test_sequence_generated_from_cigar() {
        let record = RecordBuilder::mapped_read().alignment_start(1).cigar("5S10M2I3D").build();
        assert_eq!(record.sequence().len(), 17);
    }

    #[test]
    fn test_write_indexed_bam() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reads.bam");
        let header = coordinate_sorted_header(&[("chr1", 1000)]);
        let (r1, r2) = PairBuilder::new("p").r1(0, 101, "20M").r2(0, 301, "20M").build();
        write_indexed_bam(&path, &header, vec![r2, r1])?;
        assert!(path.exists());
        assert!(dir.path().join("reads.bam.bai").exists());
        Ok(())
    }
}
