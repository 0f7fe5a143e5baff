//! Integration tests for the call command.

use std::fs;

use crate::helpers::{CallFixture, mixed_records, pair, vcf_rows};

#[test]
fn test_call_writes_vcf_and_metrics() {
    let fixture = CallFixture::new(mixed_records());
    let output = fixture.path("calls.vcf");
    let metrics = fixture.path("detection.txt");

    let result = fixture.call(&[
        "-o",
        output.to_str().unwrap(),
        "--insert-size",
        "200,400",
        "--metrics",
        metrics.to_str().unwrap(),
    ]);
    assert!(result.status.success(), "call failed: {}", String::from_utf8_lossy(&result.stderr));

    let text = fs::read_to_string(&output).expect("Failed to read VCF");
    assert!(text.starts_with("##fileformat=VCFv4.1\n"));
    assert!(text.contains("##source=gataca"));
    assert!(text.contains("##contig=<ID=chr2,length=2000>"));
    assert!(text.contains("##gatacaCommand="));
    assert!(text.contains("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n"));

    let rows = vcf_rows(&text);
    assert!(rows.iter().any(|r| r.starts_with("chr1\t110\t") && r.contains("SVTYPE=INS;SVLEN=2;")));
    assert!(rows.contains(&"chr1\t506\t.\tA\tC\t.\t.\tCONF=1;DEPTH=1;FULLDEPTH=1".to_string()));
    assert!(rows.iter().any(|r| r.contains("SVTYPE=DEL")));

    let positions: Vec<i64> = rows
        .iter()
        .filter(|r| r.starts_with("chr1\t"))
        .map(|r| r.split('\t').nth(1).unwrap().parse().unwrap())
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted, "rows of a contig are sorted by position");

    let metrics = fs::read_to_string(&metrics).expect("Failed to read metrics");
    let lines: Vec<&str> = metrics.lines().collect();
    assert_eq!(lines.len(), 2);
    let header: Vec<&str> = lines[0].split('\t').collect();
    let values: Vec<&str> = lines[1].split('\t').collect();
    let value = |name: &str| values[header.iter().position(|h| *h == name).unwrap()];
    assert_eq!(value("pairs"), "8");
    assert_eq!(value("normal_pairs"), "8");
    assert_eq!(value("hypothesis_groups"), "1");
    assert_eq!(value("min_insert_size"), "200");
    assert_eq!(value("max_insert_size"), "400");
}

#[test]
fn test_call_restricted_to_region() {
    let fixture = CallFixture::new(mixed_records());
    let result = fixture.call(&["--insert-size", "200,400", "--region", "chr1:1-450"]);
    assert!(result.status.success(), "call failed: {}", String::from_utf8_lossy(&result.stderr));

    let rows = vcf_rows(&String::from_utf8_lossy(&result.stdout));
    assert_eq!(rows.len(), 1, "rows: {rows:?}");
    assert!(rows[0].starts_with("chr1\t110\t"));
}

#[test]
fn test_call_without_evidence_writes_header_only() {
    let records = (0..4)
        .flat_map(|i| {
            let (r1, r2) = pair(&format!("p{i}"), 101 + 8 * i, "20M", 401 + 8 * i);
            [r1, r2]
        })
        .collect();
    let fixture = CallFixture::new(records);
    let result = fixture.call(&["--insert-size", "200,400"]);
    assert!(result.status.success(), "call failed: {}", String::from_utf8_lossy(&result.stderr));

    let text = String::from_utf8_lossy(&result.stdout);
    assert!(text.contains("#CHROM"));
    assert!(vcf_rows(&text).is_empty());
}
