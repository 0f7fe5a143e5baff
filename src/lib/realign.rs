//! Realignment of the soft-clipped fragments of split reads.
//!
//! A split read only becomes evidence once its clipped fragment has been placed on the
//! reference. Realignment is confined to a window around the read, so placements are
//! local and cheap. [`BwaRealigner`] shells out to `bwa aln`/`bwa samse` per read;
//! [`NoRealigner`] places nothing, leaving every fragment unmapped.

use crate::errors::GatacaError;
use crate::reference::ReferenceReader;
use anyhow::{Context, Result};
use log::debug;
use noodles::sam;
use noodles::sam::alignment::record::cigar::op::Kind;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// A clipped piece of a read's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Position of the fragment among the read's segments, in query order.
    pub ordinal: usize,
    pub sequence: Vec<u8>,
}

/// Fragments of one read and the reference window to place them in.
#[derive(Debug, Clone)]
pub struct RealignRequest<'a> {
    pub read_name: &'a [u8],
    pub fragments: &'a [Fragment],
    pub reference: usize,
    /// Window start (0-based, inclusive).
    pub start: i64,
    /// Window end (exclusive).
    pub end: i64,
}

impl<'a> RealignRequest<'a> {
    /// A request covering `flank` bases on each side of `[pos, end)`.
    #[must_use]
    pub fn around(
        read_name: &'a [u8],
        fragments: &'a [Fragment],
        reference: usize,
        pos: i64,
        end: i64,
        flank: i64,
    ) -> Self {
        Self { read_name, fragments, reference, start: pos - flank, end: end + flank }
    }
}

/// Where a fragment aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub ordinal: usize,
    pub reference: usize,
    /// Alignment start on the reference (0-based).
    pub pos: i64,
    pub cigar: Vec<(Kind, usize)>,
    pub mapq: u8,
    pub is_reverse: bool,
}

/// Places clipped fragments on the reference.
pub trait Realigner {
    /// Aligns the request's fragments inside its window. Fragments that do not align are
    /// absent from the result.
    ///
    /// # Errors
    /// Returns an error when the aligner cannot be run or its output cannot be read.
    fn realign(
        &mut self,
        request: &RealignRequest<'_>,
        reference: &ReferenceReader,
    ) -> Result<Vec<Placement>>;
}

/// Leaves every fragment unmapped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRealigner;

impl Realigner for NoRealigner {
    fn realign(&mut self, _: &RealignRequest<'_>, _: &ReferenceReader) -> Result<Vec<Placement>> {
        Ok(Vec::new())
    }
}

/// Realigns fragments with the `bwa` executable inside a private scratch directory.
///
/// The scratch directory is removed when the realigner is dropped.
#[derive(Debug)]
pub struct BwaRealigner {
    executable: PathBuf,
    scratch: TempDir,
    calls: u64,
}

impl BwaRealigner {
    /// Creates a realigner running `executable`.
    ///
    /// The executable is started once, without arguments, so a missing or unrunnable
    /// aligner fails here rather than on every split read. Its exit status is ignored.
    ///
    /// # Errors
    /// Returns an error if the executable cannot be started or the scratch directory
    /// cannot be created.
    pub fn new(executable: impl Into<PathBuf>) -> Result<Self> {
        let executable = executable.into();
        Command::new(&executable)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to execute {}", executable.display()))?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("gataca-{}-", std::process::id()))
            .tempdir()
            .context("Failed to create realignment scratch directory")?;
        debug!("Realigning split fragments in {}", scratch.path().display());
        Ok(Self { executable, scratch, calls: 0 })
    }

    /// Number of requests sent to the aligner so far.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn run(&self, args: &[&Path], stdout: Stdio, read_name: &str) -> Result<()> {
        let status = Command::new(&self.executable)
            .args(args)
            .stdout(stdout)
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to execute {}", self.executable.display()))?;
        if !status.success() {
            return Err(GatacaError::Realignment {
                read_name: read_name.to_string(),
                reason: format!(
                    "{} {} exited with {:?}",
                    self.executable.display(),
                    args.first().map(|a| a.display().to_string()).unwrap_or_default(),
                    status.code()
                ),
            }
            .into());
        }
        Ok(())
    }
}

fn write_window(path: &Path, window: &[u8]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, ">window")?;
    for line in window.chunks(80) {
        out.write_all(line)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn write_fragments(path: &Path, fragments: &[Fragment]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for fragment in fragments {
        writeln!(out, "@{}", fragment.ordinal)?;
        out.write_all(&fragment.sequence)?;
        writeln!(out, "\n+")?;
        out.write_all(&vec![b'I'; fragment.sequence.len()])?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Reads the placements out of a `bwa samse` SAM file, shifting them by `offset`.
fn read_placements(path: &Path, reference: usize, offset: i64) -> Result<Vec<Placement>> {
    let mut reader = sam::io::Reader::new(BufReader::new(File::open(path)?));
    let header = reader.read_header()?;
    let mut placements = Vec::new();
    for result in reader.record_bufs(&header) {
        let record = result?;
        let flags = record.flags();
        if flags.is_unmapped() {
            continue;
        }
        let Some(start) = record.alignment_start() else { continue };
        let Some(ordinal) = record
            .name()
            .and_then(|n| std::str::from_utf8(n.as_ref()).ok())
            .and_then(|n| n.parse::<usize>().ok())
        else {
            continue;
        };
        placements.push(Placement {
            ordinal,
            reference,
            pos: offset + i64::try_from(usize::from(start))? - 1,
            cigar: record.cigar().as_ref().iter().map(|op| (op.kind(), op.len())).collect(),
            mapq: record.mapping_quality().map_or(0, |q| q.get()),
            is_reverse: flags.is_reverse_complemented(),
        });
    }
    Ok(placements)
}

impl Realigner for BwaRealigner {
    fn realign(
        &mut self,
        request: &RealignRequest<'_>,
        reference: &ReferenceReader,
    ) -> Result<Vec<Placement>> {
        if request.fragments.is_empty() {
            return Ok(Vec::new());
        }
        let start = request.start.max(0);
        let end = request.end.min(reference.reference_length(request.reference));
        if end <= start {
            return Ok(Vec::new());
        }
        let window = reference.fetch(request.reference, start, end)?;
        let read_name = String::from_utf8_lossy(request.read_name).into_owned();

        self.calls += 1;
        let call_dir = tempfile::Builder::new()
            .prefix(&format!("{}-", self.calls))
            .tempdir_in(self.scratch.path())
            .context("Failed to create realignment directory")?;
        let dir = call_dir.path();
        let fasta = dir.join("window.fasta");
        let fastq = dir.join("fragments.fastq");
        let sai = dir.join("fragments.sai");
        let sam_path = dir.join("fragments.sam");

        write_window(&fasta, window)?;
        write_fragments(&fastq, request.fragments)?;

        let (fasta, fastq, sai) = (fasta.as_path(), fastq.as_path(), sai.as_path());
        self.run(&[Path::new("index"), fasta], Stdio::null(), &read_name)?;
        self.run(&[Path::new("aln"), fasta, fastq], Stdio::from(File::create(sai)?), &read_name)?;
        self.run(&[Path::new("samse"), fasta, sai, fastq], Stdio::from(File::create(&sam_path)?), &read_name)?;

        let placements = read_placements(&sam_path, request.reference, start)
            .with_context(|| format!("Failed to read realignments of {read_name}"))?;
        call_dir.close()?;
        Ok(placements)
    }
}
