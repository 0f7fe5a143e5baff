//! Candidate variations from the three evidence sources.
//!
//! - [`edit_tag`] reads SNPs and short indels off one read's CIGAR and MD tag
//! - [`pair`] derives structural hypotheses from the geometry of a normal pair
//! - [`split`] derives them from the parts of a split read
//!
//! Geometry rarely pins down a single event, so the pair and split factories often return
//! a [`Hypotheses::Group`] of mutually exclusive explanations for the same observation.
//! The resolver later picks at most one of them.

pub mod edit_tag;
pub mod pair;
pub mod split;

pub use edit_tag::{EditTagError, EditTagParser};
pub use pair::PairFactory;
pub use split::SplitFactory;

use crate::variation::Variation;

/// Output of a geometry factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hypotheses {
    /// An unambiguous call.
    Single(Variation),
    /// Mutually exclusive calls, at most one of which is true.
    Group(Vec<Variation>),
}

impl Hypotheses {
    /// Number of variations carried.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Hypotheses::Single(_) => 1,
            Hypotheses::Group(members) => members.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Inner-distance window of a normal pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertWindow {
    pub min: i64,
    pub max: i64,
}

impl InsertWindow {
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, size: i64) -> bool {
        self.min <= size && size <= self.max
    }
}
