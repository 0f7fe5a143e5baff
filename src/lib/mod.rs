#![deny(unsafe_code)]
// Clippy lint configuration for CI
// These lints are allowed because:
// - cast_*: Scientific/bioinformatics code intentionally casts between numeric types
// - missing_*_doc: Documentation improvements tracked separately
// - needless_pass_by_value: Some APIs designed for ownership transfer
// - items_after_statements: Some test code uses late item declarations
// - unused_self: Trait implementations may not use self
// - match_same_arms: Sometimes clearer to list arms explicitly
// - unnecessary_wraps: Some Result returns are for API consistency
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::unused_self,
    clippy::match_same_arms,
    clippy::unnecessary_wraps,
    clippy::too_many_lines,
    clippy::redundant_closure_for_method_calls,
    clippy::explicit_iter_loop,
    clippy::struct_excessive_bools,
    clippy::map_unwrap_or,
    clippy::uninlined_format_args
)]

//! # gataca - structural and small variant detection from paired-end alignments
//!
//! The library turns a coordinate-sorted, indexed BAM file and its reference into VCF
//! records of SNPs, short indels and structural variations (deletions, insertions,
//! inversions, duplications and translocations).
//!
//! ## Overview
//!
//! ### Evidence
//!
//! - **[`pairs`]** - Classification of read pairs and assembly of split reads
//! - **[`factory`]** - Candidate variations from MD tags, discordant pairs and split reads
//! - **[`realign`]** - Placement of the clipped bases of split reads
//! - **[`sample`]** - Insert-size window and coverage estimation
//!
//! ### Decision
//!
//! - **[`variation`]** - The variation model and its join rules
//! - **[`resolver`]** - Voting between mutually exclusive hypotheses
//! - **[`cluster`]** - Consensus clustering into output records
//! - **[`detector`]** - The two-pass driver tying everything together
//!
//! ### Utilities
//!
//! - **[`bam_io`]** - Paired reading of BAM files, whole or by region
//! - **[`vcf`]** - VCF output
//! - **[`reference`][mod@reference]** - Reference FASTA access
//! - **[`region`]** - Region parsing
//! - **[`validation`]** - Input validation utilities for parameters and files
//! - **[`progress`]** - Progress tracking and logging
//! - **[`logging`]** - Enhanced logging utilities with formatting
//! - **[`metrics`]** - Structured metrics types and file writing utilities
//!
//! ## Quick Start
//!
//! ```no_run
//! use gataca_lib::bam_io::IndexedBamSource;
//! use gataca_lib::detector::{DetectorSettings, call_variants};
//! use gataca_lib::realign::NoRealigner;
//! use gataca_lib::reference::ReferenceReader;
//! use gataca_lib::vcf::VcfWriter;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut source = IndexedBamSource::open("input.bam")?;
//! let reference = ReferenceReader::new("reference.fa")?;
//! let mut writer = VcfWriter::new(std::io::stdout());
//! let metrics = call_variants(
//!     &mut source,
//!     &reference,
//!     &DetectorSettings::default(),
//!     None,
//!     Box::new(NoRealigner),
//!     &mut writer,
//! )?;
//! println!("{} structural records", metrics.structural_records);
//! # Ok(())
//! # }
//! ```

pub mod bam_io;
pub mod cluster;
pub mod detector;
pub mod errors;
pub mod factory;
pub mod interval_index;
pub mod logging;
pub mod metrics;
pub mod pairs;
pub mod progress;
pub mod realign;
pub mod reference;
pub mod region;
pub mod resolver;
pub mod sam;
pub mod sample;
pub mod validation;
pub mod variation;
pub mod vcf;
