//! Alignment record utilities.
//!
//! - [`aligned_read`] decodes BAM records into the 0-based [`AlignedRead`] view
//! - [`record_utils`] holds CIGAR helpers shared by reads, split parts and realignments
//! - [`builder`] creates records and indexed BAM files for tests

pub mod aligned_read;
pub mod builder;
pub mod record_utils;

pub use aligned_read::{AlignedRead, EDIT_TAG};
pub use builder::{PairBuilder, RecordBuilder, coordinate_sorted_header, write_indexed_bam};
pub use record_utils::{
    cigar_reference_length, format_cigar, has_gaps, has_soft_clip, is_gap, leading_soft_clipping,
    parse_cigar_string, trailing_soft_clipping,
};
