//! Reference genome FASTA reading with all sequences loaded into memory.
//!
//! Sequences are held as raw uppercase bytes and addressed by reference id, in the same
//! order as the alignment header, so factories can fetch context bases in O(1) without
//! translating between names and ids. The reader doubles as the reference dictionary
//! (names and lengths) for the rest of the pipeline.

use crate::errors::GatacaError;
use ahash::AHashMap;
use anyhow::{Context, Result};
use log::debug;
use noodles::fasta;
use std::path::Path;

/// In-memory reference genome addressed by reference id.
#[derive(Debug, Clone, Default)]
pub struct ReferenceReader {
    names: Vec<String>,
    sequences: Vec<Vec<u8>>,
    index: AHashMap<String, usize>,
}

impl ReferenceReader {
    /// Loads every sequence of a FASTA file into memory.
    ///
    /// Sequence ids are assigned in file order; call [`ordered_like`](Self::ordered_like)
    /// to align them with an alignment header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or parsed.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = fasta::io::reader::Builder
            .build_from_path(path)
            .with_context(|| format!("Failed to open reference FASTA: {}", path.display()))?;

        let mut entries = Vec::new();
        for result in reader.records() {
            let record = result
                .with_context(|| format!("Failed to read FASTA record from {}", path.display()))?;
            let name = std::str::from_utf8(record.name())?.to_string();
            let sequence: &[u8] = record.sequence().as_ref();
            entries.push((name, sequence.to_vec()));
        }

        debug!("Loaded {} contigs into memory from {}", entries.len(), path.display());
        Ok(Self::from_sequences(entries))
    }

    /// Builds a reference from in-memory `(name, sequence)` pairs.
    #[must_use]
    pub fn from_sequences<N, S>(entries: impl IntoIterator<Item = (N, S)>) -> Self
    where
        N: Into<String>,
        S: AsRef<[u8]>,
    {
        let mut reference = Self::default();
        for (name, sequence) in entries {
            let name = name.into();
            reference.index.insert(name.clone(), reference.names.len());
            reference.names.push(name);
            reference.sequences.push(sequence.as_ref().to_ascii_uppercase());
        }
        reference
    }

    /// Reorders the sequences to match `names`, the reference order of an alignment header.
    ///
    /// # Errors
    /// Returns [`GatacaError::ReferenceNotFound`] if any name is missing from the FASTA.
    pub fn ordered_like(mut self, names: &[String]) -> Result<Self> {
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let id = *self
                .index
                .get(name)
                .ok_or_else(|| GatacaError::ReferenceNotFound { ref_name: name.clone() })?;
            entries.push((name.clone(), std::mem::take(&mut self.sequences[id])));
        }
        Ok(Self::from_sequences(entries))
    }

    /// Reference names in id order.
    #[must_use]
    pub fn reference_names(&self) -> &[String] {
        &self.names
    }

    /// Name of the reference with the given id.
    #[must_use]
    pub fn reference_name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Id of the reference with the given name.
    #[must_use]
    pub fn reference_id(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Length of the reference with the given id, or 0 when unknown.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn reference_length(&self, id: usize) -> i64 {
        self.sequences.get(id).map_or(0, |s| s.len() as i64)
    }

    /// Number of reference sequences.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// True when no sequences are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Fetches bases `[start, end)` (0-based) of reference `id`.
    ///
    /// # Errors
    /// Returns an error if the reference does not exist or the range is out of bounds.
    pub fn fetch(&self, id: usize, start: i64, end: i64) -> Result<&[u8]> {
        let sequence = self
            .sequences
            .get(id)
            .ok_or_else(|| GatacaError::ReferenceNotFound { ref_name: format!("#{id}") })?;

        let range = usize::try_from(start).ok().zip(usize::try_from(end).ok());
        match range {
            Some((s, e)) if s <= e && e <= sequence.len() => Ok(&sequence[s..e]),
            _ => Err(GatacaError::InvalidParameter {
                parameter: "region".to_string(),
                reason: format!(
                    "Requested region {}:{start}-{end} exceeds sequence length {}",
                    self.names[id],
                    sequence.len()
                ),
            }
            .into()),
        }
    }

    /// The uppercase base at `pos` (0-based), or `N` outside the sequence.
    #[must_use]
    pub fn base_at(&self, id: usize, pos: i64) -> u8 {
        usize::try_from(pos)
            .ok()
            .and_then(|p| self.sequences.get(id).and_then(|s| s.get(p)))
            .copied()
            .unwrap_or(b'N')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fasta(contents: &str) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(".fa").tempfile()?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_and_fetch() -> Result<()> {
        let fasta = write_fasta(">chr1\nACGTacgt\nAAAA\n>chr2\nGGGG\n")?;
        let reference = ReferenceReader::new(fasta.path())?;

        assert_eq!(reference.reference_names(), &["chr1".to_string(), "chr2".to_string()]);
        assert_eq!(reference.reference_length(0), 12);
        assert_eq!(reference.fetch(0, 2, 6)?, b"GTAC");
        assert_eq!(reference.fetch(1, 0, 4)?, b"GGGG");
        Ok(())
    }

    #[test]
    fn test_base_at_out_of_range_is_n() {
        let reference = ReferenceReader::from_sequences([("chr1", "ACGT")]);
        assert_eq!(reference.base_at(0, 0), b'A');
        assert_eq!(reference.base_at(0, 3), b'T');
        assert_eq!(reference.base_at(0, 4), b'N');
        assert_eq!(reference.base_at(0, -1), b'N');
        assert_eq!(reference.base_at(5, 0), b'N');
    }

    #[test]
    fn test_fetch_out_of_bounds() {
        let reference = ReferenceReader::from_sequences([("chr1", "ACGT")]);
        assert!(reference.fetch(0, 2, 10).is_err());
        assert!(reference.fetch(0, 3, 2).is_err());
        assert!(reference.fetch(1, 0, 1).is_err());
    }

    #[test]
    fn test_ordered_like() -> Result<()> {
        let reference = ReferenceReader::from_sequences([("chr1", "AAAA"), ("chr2", "CC")]);
        let reordered = reference.ordered_like(&["chr2".to_string(), "chr1".to_string()])?;
        assert_eq!(reordered.reference_id("chr2"), Some(0));
        assert_eq!(reordered.reference_length(0), 2);
        assert_eq!(reordered.fetch(1, 0, 4)?, b"AAAA");
        Ok(())
    }

    #[test]
    fn test_ordered_like_missing_contig() {
        let reference = ReferenceReader::from_sequences([("chr1", "AAAA")]);
        let err = reference.ordered_like(&["chrX".to_string()]).unwrap_err();
        assert!(format!("{err}").contains("chrX"));
    }
}
