//! The detection driver.
//!
//! A run makes two passes over the alignments. The first estimates the sample statistics
//! (insert-size window, coverage). The second classifies every pair and routes it:
//!
//! - every usable read goes through the edit-tag parser
//! - normal pairs go to the pair factory
//! - split pairs have their clipped fragment realigned and go to the split factory
//!
//! Unambiguous calls collect in a pool and hypothesis groups go to the resolver. Once the
//! input is exhausted the resolver votes, the pool is clustered and the clusters are
//! written as VCF rows.

use crate::bam_io::AlignmentSource;
use crate::cluster::{ClusterEngine, ClusterSettings};
use crate::factory::{EditTagParser, Hypotheses, PairFactory, SplitFactory};
use crate::logging::{OperationTimer, log_detection_summary};
use crate::metrics::DetectionMetrics;
use crate::pairs::{
    ClassifiedPair, ClassifierSettings, PairClassifier, PairKind, SplitPair, clipped_fragments,
};
use crate::progress::ProgressTracker;
use crate::realign::{RealignRequest, Realigner};
use crate::reference::ReferenceReader;
use crate::region::Region;
use crate::resolver::AmbiguityResolver;
use crate::sam::{AlignedRead, format_cigar};
use crate::sample::{SampleEstimator, SampleSettings, SampleStatistics};
use crate::variation::Variation;
use crate::vcf::VcfWriter;
use anyhow::{Context, Result};
use log::debug;
use std::io::Write;

/// Knobs of a detection run.
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub classifier: ClassifierSettings,
    pub sample: SampleSettings,
    /// SNP alleles below this confidence are not written.
    pub min_confidence: f64,
    /// Pairs between progress messages.
    pub progress_interval: u64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            classifier: ClassifierSettings::default(),
            sample: SampleSettings::default(),
            min_confidence: 0.0,
            progress_interval: 1_000_000,
        }
    }
}

/// Which factory produced a set of hypotheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evidence {
    Pair,
    Split,
}

/// Estimates the sample statistics from one pass over `source`.
///
/// # Errors
/// Returns an error if the input cannot be read or the insert-size window can neither
/// be estimated nor was given.
pub fn estimate_sample(
    source: &mut dyn AlignmentSource,
    reference: &ReferenceReader,
    classifier: &PairClassifier,
    settings: SampleSettings,
    region: Option<&Region>,
) -> Result<SampleStatistics> {
    let timer = OperationTimer::new("Estimating insert size and coverage");
    let mut estimator = SampleEstimator::new(settings, reference);
    let mut pairs = 0u64;
    source.for_each_pair(region, &mut |read, mate| {
        pairs += 1;
        for r in std::iter::once(&read).chain(mate.as_ref()) {
            if !r.is_duplicate && classifier.settings().passes_quality(r.mapq) {
                estimator.observe_read(r);
            }
        }
        estimator.observe(&classifier.classify(read, mate));
        Ok(())
    })?;
    timer.log_completion(pairs);
    estimator.finish()
}

/// Turns classified pairs into candidates and, at the end, into VCF rows.
pub struct Detector<'a> {
    reference: &'a ReferenceReader,
    sample: SampleStatistics,
    region: Option<Region>,
    classifier: PairClassifier,
    min_confidence: f64,
    realigner: Box<dyn Realigner + 'a>,
    resolver: AmbiguityResolver,
    pool: Vec<Variation>,
    metrics: DetectionMetrics,
}

impl<'a> Detector<'a> {
    #[must_use]
    pub fn new(
        settings: &DetectorSettings,
        reference: &'a ReferenceReader,
        sample: SampleStatistics,
        region: Option<Region>,
        realigner: Box<dyn Realigner + 'a>,
    ) -> Self {
        let lengths = reference_lengths(reference);
        let metrics = DetectionMetrics {
            min_insert_size: sample.min_insert_size(),
            max_insert_size: sample.max_insert_size(),
            ..DetectionMetrics::default()
        };
        Self {
            reference,
            sample,
            region,
            classifier: PairClassifier::new(settings.classifier, lengths),
            min_confidence: settings.min_confidence,
            realigner,
            resolver: AmbiguityResolver::new(),
            pool: Vec::new(),
            metrics,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> &DetectionMetrics {
        &self.metrics
    }

    /// Classifies one read and its mate and collects the evidence they carry.
    ///
    /// # Errors
    /// Returns an error only when realignment fails.
    pub fn process(&mut self, read: AlignedRead, mate: Option<AlignedRead>) -> Result<()> {
        self.metrics.pairs += 1;
        let pair = self.classifier.classify(read, mate);
        match pair.kind {
            PairKind::Normal => self.metrics.normal_pairs += 1,
            PairKind::Single => self.metrics.single_reads += 1,
            PairKind::ReadSplit | PairKind::MateSplit => self.metrics.split_pairs += 1,
            PairKind::Filtered => {
                self.metrics.filtered_pairs += 1;
                return Ok(());
            }
        }

        self.parse_edit_tags(&pair.read);
        if let Some(mate) = &pair.mate {
            self.parse_edit_tags(mate);
        }

        match pair.kind {
            PairKind::Normal => {
                let factory = PairFactory::new(self.reference, self.sample.insert_window());
                if let Some(hypotheses) = factory.hypotheses(&pair) {
                    self.accept(hypotheses, Evidence::Pair);
                }
            }
            PairKind::ReadSplit | PairKind::MateSplit => self.process_split(&pair)?,
            PairKind::Single | PairKind::Filtered => {}
        }
        Ok(())
    }

    /// Runs the edit-tag parser over `read` unless it lies outside the region. A malformed
    /// tag ends the read's variations but not the run.
    fn parse_edit_tags(&mut self, read: &AlignedRead) {
        if self.region.as_ref().is_some_and(|r| r.excludes_span(read.reference, read.pos, read.end)) {
            return;
        }
        for result in EditTagParser::new(read, self.reference) {
            match result {
                Ok(variation) => {
                    self.metrics.edit_tag_variations += 1;
                    self.pool.push(variation);
                }
                Err(e) => {
                    self.metrics.malformed_edit_tags += 1;
                    debug!(
                        "Skipping rest of MD tag of {} ({}): {e}",
                        read.name_str(),
                        format_cigar(&read.cigar)
                    );
                }
            }
        }
    }

    fn process_split(&mut self, pair: &ClassifiedPair) -> Result<()> {
        let Some((split, _, _, _)) = pair.split_sides() else { return Ok(()) };
        let fragments = clipped_fragments(split);
        let request = RealignRequest::around(
            &split.name,
            &fragments,
            split.reference,
            split.pos,
            split.end,
            self.sample.max_insert_size() + split.len(),
        );
        let placements = match self.realigner.realign(&request, self.reference) {
            Ok(placements) => placements,
            Err(e) => {
                debug!("Failed to realign clipped bases of {}: {e:#}", split.name_str());
                self.metrics.unusable_splits += 1;
                return Ok(());
            }
        };

        let settings = *self.classifier.settings();
        let Some(split_pair) = SplitPair::from_classified(
            pair,
            &placements,
            |mapq| settings.passes_quality(mapq),
            settings.min_part_length,
        ) else {
            self.metrics.unusable_splits += 1;
            return Ok(());
        };

        let factory = SplitFactory::new(self.reference, self.sample.insert_window());
        if let Some(hypotheses) = factory.hypotheses(&split_pair) {
            self.accept(hypotheses, Evidence::Split);
        }
        Ok(())
    }

    fn accept(&mut self, hypotheses: Hypotheses, evidence: Evidence) {
        let produced = hypotheses.len() as u64;
        match evidence {
            Evidence::Pair => self.metrics.pair_variations += produced,
            Evidence::Split => self.metrics.split_variations += produced,
        }
        match hypotheses {
            Hypotheses::Single(variation) => self.pool.push(variation),
            Hypotheses::Group(members) => {
                self.resolver.add_group(members);
            }
        }
    }

    /// Resolves the hypothesis groups, clusters every candidate and writes the rows.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn finish<W: Write>(mut self, writer: &mut VcfWriter<W>) -> Result<DetectionMetrics> {
        let timer = OperationTimer::new("Resolving and clustering candidates");
        self.resolver.resolve(&mut self.pool, &self.sample);
        self.metrics.record_resolution(self.resolver.stats());

        let candidates = self.pool.len() as u64;
        let mut engine = ClusterEngine::new(ClusterSettings { min_confidence: self.min_confidence });
        engine.cluster(std::mem::take(&mut self.pool));
        let (rows, stats) = engine.rows(self.reference, &self.sample, self.region.as_ref());
        for row in &rows {
            writer.write_record(row).context("Failed to write VCF record")?;
        }
        self.metrics.record_output(stats);
        timer.log_completion(candidates);

        log_detection_summary(&self.metrics);
        Ok(self.metrics)
    }
}

fn reference_lengths(reference: &ReferenceReader) -> Vec<i64> {
    (0..reference.len()).map(|id| reference.reference_length(id)).collect()
}

/// Runs detection over `source` and writes the calls to `writer`.
///
/// # Errors
/// Returns an error if the input cannot be read, realignment fails or the output cannot
/// be written.
pub fn call_variants<'a, W: Write>(
    source: &mut dyn AlignmentSource,
    reference: &'a ReferenceReader,
    settings: &DetectorSettings,
    region: Option<Region>,
    realigner: Box<dyn Realigner + 'a>,
    writer: &mut VcfWriter<W>,
) -> Result<DetectionMetrics> {
    let classifier = PairClassifier::new(settings.classifier, reference_lengths(reference));
    let sample =
        estimate_sample(source, reference, &classifier, settings.sample.clone(), region.as_ref())?;

    let query = region.clone();
    let mut detector = Detector::new(settings, reference, sample, region, realigner);
    let timer = OperationTimer::new("Collecting evidence");
    let mut progress =
        ProgressTracker::new("Processed pairs:").with_interval(settings.progress_interval);
    source.for_each_pair(query.as_ref(), &mut |read, mate| {
        progress.record(1);
        detector.process(read, mate)
    })?;
    progress.log_final();
    timer.log_completion(progress.count());

    writer.write_header().context("Failed to write VCF header")?;
    detector.finish(writer)
}
