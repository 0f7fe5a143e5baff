//! Common CLI options.
//!
//! Argument groups are composed into command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use gataca_lib::pairs::{ClassifierSettings, Policy};
use gataca_lib::sample::SampleSettings;
use gataca_lib::validation::{
    parse_min_max, validate_file_exists, validate_fraction, validate_positive,
};
use gataca_lib::vcf::is_stdout_path;

/// Input and output locations.
#[derive(Debug, Clone, Args)]
pub struct CallIoOptions {
    /// Input BAM file, coordinate sorted (an index is required with --region)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Reference FASTA the reads were aligned to
    #[arg(short = 'r', long = "reference")]
    pub reference: PathBuf,

    /// Output VCF file, or `-` for standard output
    #[arg(short = 'o', long = "output", default_value = "-")]
    pub output: PathBuf,
}

impl CallIoOptions {
    /// Validates that the inputs exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the BAM or the FASTA does not exist.
    pub fn validate(&self) -> Result<()> {
        validate_file_exists(&self.input, "Input BAM")?;
        validate_file_exists(&self.reference, "Reference FASTA")?;
        Ok(())
    }

    /// True when the VCF goes to standard output.
    #[must_use]
    pub fn writes_stdout(&self) -> bool {
        is_stdout_path(&self.output)
    }
}

/// Read filtering and orientation.
#[derive(Debug, Clone, Args)]
pub struct ClassifierOptions {
    /// Expected orientation of read pairs
    #[arg(long = "policy", value_enum, default_value_t = Policy::ForwardReverse)]
    pub policy: Policy,

    /// Minimum mapping quality of a usable read (0 accepts everything)
    #[arg(long = "min-quality", default_value = "30")]
    pub min_quality: u8,

    /// Minimum length of each part of a split read
    #[arg(long = "min-part-length", default_value = "10")]
    pub min_part_length: i64,
}

impl ClassifierOptions {
    /// # Errors
    ///
    /// Returns an error if the minimum part length is not positive.
    pub fn validate(&self) -> Result<()> {
        validate_positive(self.min_part_length, "min-part-length")?;
        Ok(())
    }

    #[must_use]
    pub fn settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            min_quality: self.min_quality,
            min_part_length: self.min_part_length,
            policy: self.policy,
        }
    }
}

/// Insert-size and coverage estimation.
#[derive(Debug, Clone, Args)]
pub struct SampleOptions {
    /// Width of the coverage windows
    #[arg(long = "window-size", default_value = "100")]
    pub window_size: i64,

    /// Insert-size window as MIN,MAX; estimated from the data when absent
    #[arg(long = "insert-size")]
    pub insert_size: Option<String>,

    /// Number of normal pairs sampled for the insert-size estimate
    #[arg(long = "insert-reads", default_value = "10000")]
    pub insert_reads: usize,

    /// Fraction of the sorted insert sizes kept at the center of the distribution
    #[arg(long = "insert-core", default_value = "0.1")]
    pub insert_core: f64,

    /// Minimum number of values kept at the center of the distribution
    #[arg(long = "min-core-count", default_value = "10")]
    pub min_core_count: usize,

    /// Coverage bounds as MIN,MAX; estimated from the data when absent
    #[arg(long = "coverage")]
    pub coverage: Option<String>,
}

impl SampleOptions {
    /// Validates the options and converts them into [`SampleSettings`].
    ///
    /// # Errors
    ///
    /// Returns an error if a number is out of range or a MIN,MAX pair is malformed.
    pub fn settings(&self) -> Result<SampleSettings> {
        validate_positive(self.window_size, "window-size")?;
        validate_positive(self.insert_reads, "insert-reads")?;
        validate_fraction(self.insert_core, "insert-core")?;
        validate_positive(self.min_core_count, "min-core-count")?;
        let insert_size =
            self.insert_size.as_deref().map(|v| parse_min_max(v, "insert-size")).transpose()?;
        let coverage = self.coverage.as_deref().map(|v| parse_min_max(v, "coverage")).transpose()?;
        Ok(SampleSettings {
            window_size: self.window_size,
            insert_reads: self.insert_reads,
            core: self.insert_core,
            min_core_count: self.min_core_count,
            insert_size,
            coverage,
        })
    }
}
