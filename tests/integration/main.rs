//! Integration tests for the gataca binary.
//!
//! These tests generate small indexed BAM files and FASTA references and run the `call`
//! command end to end.

mod helpers;
mod test_call_command;
mod test_error_paths;
