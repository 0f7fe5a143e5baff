//! Invalid invocations of the call command.

use std::fs;

use crate::helpers::{CallFixture, mixed_records};

fn stderr(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_missing_input() {
    let fixture = CallFixture::new(mixed_records());
    fs::remove_file(&fixture.input).expect("Failed to remove BAM");
    let result = fixture.call(&[]);
    assert!(!result.status.success());
    assert!(stderr(&result).contains("does not exist"));
}

#[test]
fn test_malformed_insert_size() {
    let fixture = CallFixture::new(mixed_records());
    let result = fixture.call(&["--insert-size", "400,200"]);
    assert!(!result.status.success());
    assert!(stderr(&result).contains("insert-size"));
}

#[test]
fn test_min_confidence_out_of_range() {
    let fixture = CallFixture::new(mixed_records());
    let result = fixture.call(&["--min-confidence", "2"]);
    assert!(!result.status.success());
    assert!(stderr(&result).contains("min-confidence"));
}

#[test]
fn test_unknown_region_contig() {
    let fixture = CallFixture::new(mixed_records());
    let result = fixture.call(&["--insert-size", "200,400", "--region", "chrZ:1-100"]);
    assert!(!result.status.success());
    assert!(stderr(&result).contains("chrZ"));
}

#[test]
fn test_reference_missing_contig() {
    let fixture = CallFixture::new(mixed_records());
    fs::write(&fixture.reference, format!(">chr1\n{}\n", "ACGT".repeat(500)))
        .expect("Failed to rewrite FASTA");
    let result = fixture.call(&["--insert-size", "200,400"]);
    assert!(!result.status.success());
    assert!(stderr(&result).contains("chr2"));
}
