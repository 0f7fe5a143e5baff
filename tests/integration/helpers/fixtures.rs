//! Input files for the `call` command.

#![allow(dead_code)]

use gataca_lib::sam::builder::{PairBuilder, coordinate_sorted_header, write_indexed_bam};
use noodles::sam::alignment::RecordBuf;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Length of each test contig.
pub const CONTIG_LENGTH: usize = 2_000;

/// A scratch directory holding `ref.fa`, `input.bam` and its index.
pub struct CallFixture {
    pub dir: TempDir,
    pub reference: PathBuf,
    pub input: PathBuf,
}

impl CallFixture {
    /// Writes a two-contig reference and an indexed BAM of `records`.
    pub fn new(records: Vec<RecordBuf>) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let reference = dir.path().join("ref.fa");
        write_reference(&reference);
        let input = dir.path().join("input.bam");
        let header = coordinate_sorted_header(&[("chr1", CONTIG_LENGTH), ("chr2", CONTIG_LENGTH)]);
        write_indexed_bam(&input, &header, records).expect("Failed to write BAM");
        Self { dir, reference, input }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Runs `gataca call` on the fixture with `extra` arguments.
    pub fn call(&self, extra: &[&str]) -> Output {
        let mut args = vec![
            "call".to_string(),
            "-i".to_string(),
            self.input.display().to_string(),
            "-r".to_string(),
            self.reference.display().to_string(),
        ];
        args.extend(extra.iter().map(ToString::to_string));
        Command::new(env!("CARGO_BIN_EXE_gataca"))
            .args(&args)
            .output()
            .expect("Failed to run gataca")
    }
}

/// Writes `chr1` and `chr2`, both repeating `ACGT`.
pub fn write_reference(path: &Path) {
    let sequence = "ACGT".repeat(CONTIG_LENGTH / 4);
    fs::write(path, format!(">chr1\n{sequence}\n>chr2\n{sequence}\n"))
        .expect("Failed to write FASTA");
}

/// A pair with reads at the given 1-based starts on `chr1`.
pub fn pair(name: &str, r1_start: usize, r1_cigar: &str, r2_start: usize) -> (RecordBuf, RecordBuf) {
    PairBuilder::new(name).r1(0, r1_start, r1_cigar).r2(0, r2_start, "20M").build()
}

/// Records supporting an insertion, a SNP and a discordant pair, plus plain normal pairs.
pub fn mixed_records() -> Vec<RecordBuf> {
    let mut records = Vec::new();
    let (r1, r2) = PairBuilder::new("ins")
        .r1(0, 101, "10M2I10M")
        .r2(0, 401, "20M")
        .with_r1(|b| b.tag("MD", "20"))
        .build();
    records.extend([r1, r2]);

    let (r1, r2) = PairBuilder::new("snp")
        .r1(0, 501, "20M")
        .r2(0, 801, "20M")
        .with_r1(|b| b.tag("MD", "5A14"))
        .build();
    records.extend([r1, r2]);

    let (r1, r2) = pair("long", 1_001, "20M", 1_521);
    records.extend([r1, r2]);

    for i in 0..5 {
        let (r1, r2) = pair(&format!("normal{i}"), 1_201 + 4 * i, "20M", 1_501 + 4 * i);
        records.extend([r1, r2]);
    }
    records
}

/// Data lines of a VCF text.
pub fn vcf_rows(text: &str) -> Vec<String> {
    text.lines().filter(|l| !l.starts_with('#')).map(str::to_string).collect()
}
