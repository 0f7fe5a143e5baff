//! Read pairs as detection evidence.
//!
//! - [`classifier`] orders a read and its mate and assigns an evidence category
//! - [`split`] cuts soft-clipped reads into parts once their clipped fragments are placed

pub mod classifier;
pub mod split;

pub use classifier::{ClassifiedPair, ClassifierSettings, PairClassifier, PairKind, Policy};
pub use split::{SplitPair, SplitPart, SplitRead, clipped_fragments};
