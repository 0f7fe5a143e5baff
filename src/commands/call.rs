//! Detect SNPs, indels and structural variants from paired-end alignments.

use anyhow::{Context, Result};
use clap::Parser;
use gataca_lib::bam_io::{AlignmentSource, IndexedBamSource, reference_names};
use gataca_lib::detector::{DetectorSettings, call_variants};
use gataca_lib::logging::OperationTimer;
use gataca_lib::metrics::write_metrics_auto;
use gataca_lib::realign::{BwaRealigner, NoRealigner, Realigner};
use gataca_lib::reference::ReferenceReader;
use gataca_lib::region::Region;
use gataca_lib::validation::validate_fraction;
use gataca_lib::vcf::{VcfWriter, create_output};
use log::info;
use std::path::PathBuf;

use crate::commands::command::Command;
use crate::commands::common::{CallIoOptions, ClassifierOptions, SampleOptions};

/// Call variants from a coordinate-sorted BAM file.
#[derive(Debug, Parser)]
#[command(
    name = "call",
    about = "\x1b[38;5;72m[CALLING]\x1b[0m        \x1b[36mCall SNPs, indels and structural variants\x1b[0m",
    long_about = r#"
Call SNPs, short indels and structural variants from paired-end alignments.

Evidence comes from three sources:
  - MD tags and CIGARs of single reads (SNPs, short insertions and deletions)
  - the placement of read pairs relative to the insert-size window
  - split reads whose clipped bases realign elsewhere (requires --bwa)

The insert-size window and coverage bounds are estimated in a first pass over the input
unless given with --insert-size and --coverage. Ambiguous explanations of one pair are
resolved by the other evidence, and overlapping calls are merged into consensus records.

The input must be coordinate sorted. An index (.bai) is required when --region is given.

Example usage:
  gataca call -i sample.bam -r ref.fa -o calls.vcf
  gataca call -i sample.bam -r ref.fa --region chr2:1000000-2000000 --bwa bwa
  gataca call -i sample.bam -r ref.fa --insert-size 250,450 --metrics detection.txt
"#
)]
pub struct Call {
    #[command(flatten)]
    pub io: CallIoOptions,

    /// Restrict calling to a region: `chr`, `chr:start` or `chr:start-end` (1-based, inclusive)
    #[arg(long = "region")]
    pub region: Option<String>,

    #[command(flatten)]
    pub classifier: ClassifierOptions,

    #[command(flatten)]
    pub sample: SampleOptions,

    /// Minimum confidence of a reported SNP allele
    #[arg(long = "min-confidence", default_value = "0")]
    pub min_confidence: f64,

    /// Path to the bwa executable; enables realignment of split reads
    #[arg(long = "bwa")]
    pub bwa: Option<PathBuf>,

    /// Optional output file for detection metrics
    #[arg(long = "metrics")]
    pub metrics: Option<PathBuf>,
}

impl Call {
    fn settings(&self) -> Result<DetectorSettings> {
        self.io.validate()?;
        self.classifier.validate()?;
        validate_fraction(self.min_confidence, "min-confidence")?;
        Ok(DetectorSettings {
            classifier: self.classifier.settings(),
            sample: self.sample.settings()?,
            min_confidence: self.min_confidence,
            ..DetectorSettings::default()
        })
    }

    fn realigner(&self) -> Result<Box<dyn Realigner>> {
        match &self.bwa {
            Some(bwa) => {
                info!("Realigning split reads with {}", bwa.display());
                Ok(Box::new(BwaRealigner::new(bwa)?))
            }
            None => {
                info!("No --bwa given; split reads are not realigned");
                Ok(Box::new(NoRealigner))
            }
        }
    }
}

impl Command for Call {
    fn execute(&self, command_line: &str) -> Result<()> {
        let settings = self.settings()?;

        let timer = OperationTimer::new("Calling variants");
        info!("Input: {}", self.io.input.display());
        info!("Reference: {}", self.io.reference.display());
        if self.io.writes_stdout() {
            info!("Output: standard output");
        } else {
            info!("Output: {}", self.io.output.display());
        }
        info!("Pair policy: {:?}", settings.classifier.policy);

        let mut source = IndexedBamSource::open(&self.io.input)?;
        let names = reference_names(source.header());
        let reference = ReferenceReader::new(&self.io.reference)?
            .ordered_like(&names)
            .context("Reference FASTA does not match the BAM header")?;

        let region = match &self.region {
            Some(value) => {
                let region = Region::parse(value, &reference)?;
                info!("Region: {value}");
                Some(region)
            }
            None => None,
        };

        let contigs: Vec<(String, i64)> = names
            .iter()
            .enumerate()
            .map(|(id, name)| (name.clone(), reference.reference_length(id)))
            .collect();
        let mut writer =
            VcfWriter::with_gataca_header(create_output(&self.io.output)?, &self.io.reference, &contigs);
        writer.add_header_line("gatacaCommand", command_line);

        let metrics = call_variants(
            &mut source,
            &reference,
            &settings,
            region,
            self.realigner()?,
            &mut writer,
        )?;
        writer.finish().context("Failed to finish VCF output")?;

        if let Some(path) = &self.metrics {
            write_metrics_auto(path, std::slice::from_ref(&metrics))?;
            info!("Wrote detection metrics to {}", path.display());
        }

        timer.log_completion(metrics.pairs);
        Ok(())
    }
}
