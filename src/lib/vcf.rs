//! VCF output.
//!
//! The writer owns the file framing: meta lines, INFO and ALT definitions, contigs and the
//! column header. Records arrive as finished tab-separated rows.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// One `##INFO` definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoField {
    pub id: String,
    pub number: String,
    pub kind: String,
    pub description: String,
}

/// INFO fields of gataca records.
pub const INFO_FIELDS: &[(&str, &str, &str, &str)] = &[
    ("SVTYPE", "1", "String", "Type of structural variant"),
    ("END", "1", "Integer", "End position of the variant"),
    ("IMPRECISE", "0", "Flag", "Imprecise structural variation"),
    ("CILEN", "2", "Integer", "Confidence interval of length of variation"),
    ("CPOS", "1", "Integer", "Confidence of POS"),
    ("CEND", "1", "Integer", "Confidence of END"),
    ("TRACHROM", "1", "String", "Chromosome of translocated sequence"),
    ("TRAPOS", "1", "Integer", "Start position of translocated sequence"),
    ("TRAEND", "1", "Integer", "End position of translocated sequence"),
    ("TRACPOS", "1", "Integer", "Confidence of start position of translocated sequence"),
    ("TRACEND", "1", "Integer", "Confidence of end position of translocated sequence"),
    ("CONF", "A", "Float", "Confidence of each variation"),
    ("DEPTH", "A", "Integer", "Number of reads supporting each variation"),
    ("FULLDEPTH", "1", "Integer", "Number of reads covering the variation"),
];

/// Symbolic alleles of gataca records.
pub const ALT_TYPES: &[(&str, &str)] = &[
    ("DEL", "Deletion"),
    ("INS", "Insertion"),
    ("INV", "Inversion"),
    ("DUP", "Duplication"),
    ("DUP:TANDEM", "Tandem duplication"),
    ("INS:TRA", "Translocation"),
];

const COLUMNS: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";

/// A VCF writer over any sink.
pub struct VcfWriter<W: Write> {
    inner: W,
    meta: Vec<(String, String)>,
    infos: Vec<InfoField>,
    alts: Vec<(String, String)>,
    contigs: Vec<(String, i64)>,
    header_written: bool,
    records: u64,
}

impl<W: Write> VcfWriter<W> {
    /// An empty writer; nothing is written until the header is.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            meta: Vec::new(),
            infos: Vec::new(),
            alts: Vec::new(),
            contigs: Vec::new(),
            header_written: false,
            records: 0,
        }
    }

    /// A writer preloaded with the gataca meta lines, definitions and `contigs`.
    pub fn with_gataca_header(inner: W, reference: &Path, contigs: &[(String, i64)]) -> Self {
        let mut writer = Self::new(inner);
        writer.add_header_line("fileDate", &file_date(SystemTime::now()));
        writer.add_header_line("source", "gataca");
        writer.add_header_line("reference", &reference.display().to_string());
        for &(id, number, kind, description) in INFO_FIELDS {
            writer.add_info_field(id, number, kind, description);
        }
        for &(id, description) in ALT_TYPES {
            writer.add_alt_type(id, description);
        }
        for (name, length) in contigs {
            writer.add_contig(name, *length);
        }
        writer
    }

    pub fn add_header_line(&mut self, key: &str, value: &str) {
        self.meta.push((key.to_string(), value.to_string()));
    }

    pub fn add_info_field(&mut self, id: &str, number: &str, kind: &str, description: &str) {
        self.infos.push(InfoField {
            id: id.to_string(),
            number: number.to_string(),
            kind: kind.to_string(),
            description: description.to_string(),
        });
    }

    pub fn add_alt_type(&mut self, id: &str, description: &str) {
        self.alts.push((id.to_string(), description.to_string()));
    }

    pub fn add_contig(&mut self, name: &str, length: i64) {
        self.contigs.push((name.to_string(), length));
    }

    /// Writes the header. Later calls do nothing.
    ///
    /// # Errors
    /// Returns an error if the sink fails.
    pub fn write_header(&mut self) -> io::Result<()> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.inner, "##fileformat=VCFv4.1")?;
        for (key, value) in &self.meta {
            writeln!(self.inner, "##{key}={value}")?;
        }
        for (name, length) in &self.contigs {
            writeln!(self.inner, "##contig=<ID={name},length={length}>")?;
        }
        for info in &self.infos {
            writeln!(
                self.inner,
                "##INFO=<ID={},Number={},Type={},Description=\"{}\">",
                info.id, info.number, info.kind, info.description
            )?;
        }
        for (id, description) in &self.alts {
            writeln!(self.inner, "##ALT=<ID={id},Description=\"{description}\">")?;
        }
        writeln!(self.inner, "{COLUMNS}")?;
        self.header_written = true;
        Ok(())
    }

    /// Writes one row, writing the header first if needed. Blank rows are ignored.
    ///
    /// # Errors
    /// Returns an error if the sink fails.
    pub fn write_record(&mut self, row: &str) -> io::Result<()> {
        self.write_header()?;
        if row.trim().is_empty() {
            return Ok(());
        }
        writeln!(self.inner, "{row}")?;
        self.records += 1;
        Ok(())
    }

    /// Rows written so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Writes the header if nothing was written and flushes.
    ///
    /// # Errors
    /// Returns an error if the sink fails.
    pub fn finish(mut self) -> io::Result<W> {
        self.write_header()?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// True when `path` designates standard output.
pub fn is_stdout_path<P: AsRef<Path>>(path: P) -> bool {
    let path_str = path.as_ref().to_string_lossy();
    path_str == "-" || path_str == "/dev/stdout"
}

/// Opens the VCF destination: standard output for `-`, a file otherwise.
///
/// # Errors
/// Returns an error if the file cannot be created.
pub fn create_output<P: AsRef<Path>>(path: P) -> Result<Box<dyn Write>> {
    let path = path.as_ref();
    if is_stdout_path(path) {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create output VCF: {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

/// `YYYYMMDD` in UTC.
fn file_date(now: SystemTime) -> String {
    let days = now.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs() / 86_400);
    let (year, month, day) = civil_from_days(i64::try_from(days).unwrap_or(0));
    format!("{year:04}{month:02}{day:02}")
}

/// Proleptic Gregorian date of a day count since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(0, "19700101")]
    #[case(951_782_400, "20000229")]
    #[case(1_792_281_600, "20261018")]
    fn test_file_date(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(file_date(UNIX_EPOCH + Duration::from_secs(secs)), expected);
    }

    #[test]
    fn test_header_then_records() -> io::Result<()> {
        let contigs = vec![("chr1".to_string(), 1_000)];
        let mut writer =
            VcfWriter::with_gataca_header(Vec::new(), Path::new("ref.fa"), &contigs);
        writer.write_record("chr1\t10\t.\tA\tG\t.\t.\tCONF=1;DEPTH=1;FULLDEPTH=1")?;
        writer.write_record("  ")?;
        assert_eq!(writer.records(), 1);
        let text = String::from_utf8(writer.finish()?).expect("utf8");

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "##fileformat=VCFv4.1");
        assert!(lines[1].starts_with("##fileDate="));
        assert_eq!(lines[2], "##source=gataca");
        assert_eq!(lines[3], "##reference=ref.fa");
        assert_eq!(lines[4], "##contig=<ID=chr1,length=1000>");
        assert!(text.contains("##INFO=<ID=CONF,Number=A,Type=Float,Description=\"Confidence of each variation\">"));
        assert!(text.contains("##ALT=<ID=DUP:TANDEM,Description=\"Tandem duplication\">"));
        assert_eq!(lines[lines.len() - 2], COLUMNS);
        assert!(lines[lines.len() - 1].starts_with("chr1\t10\t"));
        Ok(())
    }

    #[test]
    fn test_empty_output_still_has_header() -> io::Result<()> {
        let text = String::from_utf8(VcfWriter::new(Vec::new()).finish()?).expect("utf8");
        assert_eq!(text, format!("##fileformat=VCFv4.1\n{COLUMNS}\n"));
        Ok(())
    }

    #[test]
    fn test_stdout_path() {
        assert!(is_stdout_path("-"));
        assert!(!is_stdout_path("calls.vcf"));
    }
}
