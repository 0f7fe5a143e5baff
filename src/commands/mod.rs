//! CLI command implementations for gataca.
//!
//! - [`call`] - Detect SNPs, indels and structural variants from an indexed BAM

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::too_many_lines,
    clippy::uninlined_format_args
)]

pub mod call;
pub mod command;
pub mod common;
