//! Alignment input.
//!
//! Detection consumes reads as pairs: every template is visited once, with its two
//! primary alignments side by side. Reads arrive in coordinate order, so the earlier
//! mate is parked by name until the later one shows up. A mate that cannot appear in
//! the stream (outside the requested region, or filtered away) is looked up through the
//! index when one is available and otherwise treated as absent.

use crate::region::Region;
use crate::sam::AlignedRead;
use ahash::AHashMap;
use anyhow::{Context, Result};
use noodles::bam;
use noodles::core::Position;
use noodles::sam::Header;
use noodles::sam::alignment::RecordBuf;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Callback receiving one read and its mate, when found.
pub type PairVisitor<'a> = dyn FnMut(AlignedRead, Option<AlignedRead>) -> Result<()> + 'a;

/// A source of read pairs.
pub trait AlignmentSource {
    /// The header of the alignments.
    fn header(&self) -> &Header;

    /// Visits every pair overlapping `region` (the whole input when `None`) exactly once.
    ///
    /// # Errors
    /// Returns an error when the input cannot be read or `visit` fails.
    fn for_each_pair(&mut self, region: Option<&Region>, visit: &mut PairVisitor<'_>) -> Result<()>;
}

/// Opens a BAM file and reads its header.
///
/// # Errors
/// Returns an error if the file cannot be opened or the header cannot be read.
pub fn create_bam_reader<P: AsRef<Path>>(
    path: P,
) -> Result<(bam::io::Reader<noodles::bgzf::io::Reader<File>>, Header)> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input BAM: {}", path_ref.display()))?;
    let mut reader = bam::io::Reader::from(noodles::bgzf::io::Reader::new(file));
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path_ref.display()))?;
    Ok((reader, header))
}

/// Reference names of a header, in dictionary order.
#[must_use]
pub fn reference_names(header: &Header) -> Vec<String> {
    header.reference_sequences().keys().map(ToString::to_string).collect()
}

/// Pairs up a coordinate-sorted stream of records.
struct Pairing<'v, 'a> {
    region: Option<&'v Region>,
    pending: AHashMap<Vec<u8>, AlignedRead>,
    visit: &'v mut PairVisitor<'a>,
}

impl<'v, 'a> Pairing<'v, 'a> {
    fn new(region: Option<&'v Region>, visit: &'v mut PairVisitor<'a>) -> Self {
        Self { region, pending: AHashMap::new(), visit }
    }

    /// True when the mate of `read` is still to come in the stream.
    fn mate_ahead(&self, read: &AlignedRead) -> bool {
        let (Some(reference), Some(pos)) = (read.mate_reference, read.mate_pos) else {
            return false;
        };
        (reference, pos) >= (read.reference, read.pos)
            && !self.region.is_some_and(|r| r.excludes_span(reference, pos, pos + 1))
    }

    fn push(
        &mut self,
        read: AlignedRead,
        lookup: &mut dyn FnMut(&AlignedRead) -> Result<Option<AlignedRead>>,
    ) -> Result<()> {
        if !read.has_mapped_mate() {
            return (self.visit)(read, None);
        }
        if let Some(mate) = self.pending.remove(&read.name) {
            return (self.visit)(mate, Some(read));
        }
        if self.mate_ahead(&read) {
            self.pending.insert(read.name.clone(), read);
            return Ok(());
        }
        let mate = lookup(&read)?;
        (self.visit)(read, mate)
    }

    /// Visits reads whose mate never arrived.
    fn finish(mut self) -> Result<()> {
        let mut orphans: Vec<AlignedRead> = self.pending.drain().map(|(_, read)| read).collect();
        orphans.sort_by_key(|r| (r.reference, r.pos));
        for read in orphans {
            (self.visit)(read, None)?;
        }
        Ok(())
    }
}

/// True when `candidate` is the primary alignment of the other segment of `read`.
fn is_mate_of(candidate: &AlignedRead, read: &AlignedRead) -> bool {
    candidate.name == read.name
        && candidate.is_first_segment != read.is_first_segment
        && Some(candidate.pos) == read.mate_pos
}

/// A coordinate-sorted BAM file. An index is required to restrict reading to a region.
#[derive(Debug)]
pub struct IndexedBamSource {
    path: PathBuf,
    header: Header,
}

impl IndexedBamSource {
    /// Opens `path` and reads its header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or has no readable header.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let (_, header) = create_bam_reader(&path)?;
        Ok(Self { path, header })
    }

    fn for_each_in_file(&self, visit: &mut PairVisitor<'_>) -> Result<()> {
        let (mut reader, header) = create_bam_reader(&self.path)?;
        let mut pairing = Pairing::new(None, visit);
        let mut no_lookup = |_: &AlignedRead| -> Result<Option<AlignedRead>> { Ok(None) };
        for result in reader.record_bufs(&header) {
            let record = result.context("Failed to read BAM record")?;
            if let Some(read) = AlignedRead::from_record(&record)? {
                pairing.push(read, &mut no_lookup)?;
            }
        }
        pairing.finish()
    }

    fn for_each_in_region(&self, region: &Region, visit: &mut PairVisitor<'_>) -> Result<()> {
        let open_indexed = || {
            bam::io::indexed_reader::Builder::default()
                .build_from_path(&self.path)
                .with_context(|| format!("Failed to open indexed BAM: {}", self.path.display()))
        };
        let mut reader = open_indexed()?;
        let header = reader.read_header()?;
        let mut mates = open_indexed()?;
        mates.read_header()?;

        let mut lookup = |read: &AlignedRead| -> Result<Option<AlignedRead>> {
            let (Some(reference), Some(pos)) = (read.mate_reference, read.mate_pos) else {
                return Ok(None);
            };
            let Some((name, _)) = header.reference_sequences().get_index(reference) else {
                return Ok(None);
            };
            let start = Position::try_from(usize::try_from(pos + 1)?)?;
            let query_region = noodles::core::Region::new(name.to_string(), start..=start);
            for result in mates.query(&header, &query_region)? {
                let record = RecordBuf::try_from_alignment_record(&header, &result?)?;
                if let Some(candidate) = AlignedRead::from_record(&record)? {
                    if is_mate_of(&candidate, read) {
                        return Ok(Some(candidate));
                    }
                }
            }
            Ok(None)
        };

        let mut pairing = Pairing::new(Some(region), visit);
        let query = region.to_query()?;
        for result in reader.query(&header, &query)? {
            let record = RecordBuf::try_from_alignment_record(&header, &result?)?;
            if let Some(read) = AlignedRead::from_record(&record)? {
                pairing.push(read, &mut lookup)?;
            }
        }
        pairing.finish()
    }
}

impl AlignmentSource for IndexedBamSource {
    fn header(&self) -> &Header {
        &self.header
    }

    fn for_each_pair(&mut self, region: Option<&Region>, visit: &mut PairVisitor<'_>) -> Result<()> {
        match region {
            Some(region) => self.for_each_in_region(region, visit),
            None => self.for_each_in_file(visit),
        }
    }
}

/// Records held in memory, sorted by coordinate on construction.
#[derive(Debug, Clone)]
pub struct RecordSource {
    header: Header,
    records: Vec<AlignedRead>,
}

impl RecordSource {
    /// Decodes `records`, dropping those that take no part in detection.
    ///
    /// # Errors
    /// Returns an error if a record cannot be decoded.
    pub fn new(header: Header, records: &[RecordBuf]) -> Result<Self> {
        let mut reads = Vec::with_capacity(records.len());
        for record in records {
            if let Some(read) = AlignedRead::from_record(record)? {
                reads.push(read);
            }
        }
        reads.sort_by_key(|r| (r.reference, r.pos));
        Ok(Self { header, records: reads })
    }
}

impl AlignmentSource for RecordSource {
    fn header(&self) -> &Header {
        &self.header
    }

    fn for_each_pair(&mut self, region: Option<&Region>, visit: &mut PairVisitor<'_>) -> Result<()> {
        let records = &self.records;
        let mut lookup = |read: &AlignedRead| -> Result<Option<AlignedRead>> {
            Ok(records.iter().find(|candidate| is_mate_of(candidate, read)).cloned())
        };
        let mut pairing = Pairing::new(region, visit);
        for read in records {
            if region.is_some_and(|r| r.excludes_span(read.reference, read.pos, read.end)) {
                continue;
            }
            pairing.push(read.clone(), &mut lookup)?;
        }
        pairing.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceReader;
    use crate::sam::builder::{
        PairBuilder, RecordBuilder, coordinate_sorted_header, write_indexed_bam,
    };
    use tempfile::TempDir;

    fn records() -> Vec<RecordBuf> {
        let (a1, a2) = PairBuilder::new("a").r1(0, 101, "20M").r2(0, 401, "20M").build();
        let (b1, b2) = PairBuilder::new("b").r1(0, 1_901, "20M").r2(1, 51, "20M").build();
        let single = RecordBuilder::mapped_read().name("s").alignment_start(251).cigar("20M").build();
        let secondary = RecordBuilder::mapped_read()
            .name("x")
            .alignment_start(301)
            .cigar("20M")
            .secondary(true)
            .build();
        vec![a2, b2, single, a1, b1, secondary]
    }

    fn header() -> Header {
        coordinate_sorted_header(&[("chr1", 2_000), ("chr2", 2_000)])
    }

    fn collect(source: &mut dyn AlignmentSource, region: Option<&Region>) -> Result<Vec<(String, bool)>> {
        let mut seen = Vec::new();
        source.for_each_pair(region, &mut |read, mate| {
            seen.push((read.name_str(), mate.is_some()));
            Ok(())
        })?;
        seen.sort();
        Ok(seen)
    }

    fn region(text: &str) -> Result<Region> {
        let reference = ReferenceReader::from_sequences([("chr1", "A"), ("chr2", "A")]);
        Ok(Region::parse(text, &reference)?)
    }

    #[test]
    fn test_pairs_are_visited_once() -> Result<()> {
        let mut source = RecordSource::new(header(), &records())?;
        let seen = collect(&mut source, None)?;
        assert_eq!(
            seen,
            vec![("a".to_string(), true), ("b".to_string(), true), ("s".to_string(), false)]
        );
        Ok(())
    }

    #[test]
    fn test_mate_outside_region_is_looked_up() -> Result<()> {
        let mut source = RecordSource::new(header(), &records())?;
        let seen = collect(&mut source, Some(&region("chr2")?))?;
        assert_eq!(seen, vec![("b".to_string(), true)]);
        Ok(())
    }

    #[test]
    fn test_indexed_bam_source() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("input.bam");
        write_indexed_bam(&path, &header(), records())?;

        let mut source = IndexedBamSource::open(&path)?;
        assert_eq!(reference_names(source.header()), vec!["chr1", "chr2"]);
        assert_eq!(collect(&mut source, None)?.len(), 3);

        let seen = collect(&mut source, Some(&region("chr1:1-300")?))?;
        assert_eq!(seen, vec![("a".to_string(), true), ("s".to_string(), false)]);

        let seen = collect(&mut source, Some(&region("chr2")?))?;
        assert_eq!(seen, vec![("b".to_string(), true)]);
        Ok(())
    }
}
