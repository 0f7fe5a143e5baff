//! Genomic region of interest.
//!
//! A region restricts both the reads that are fetched and the records that are written.
//! It is given on the command line as `chr`, `chr:start` or `chr:start-end` with 1-based
//! inclusive coordinates and stored 0-based.

use crate::errors::{GatacaError, Result};
use crate::reference::ReferenceReader;
use noodles::core::Position;

/// A reference sequence with optional bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Reference id.
    pub reference: usize,
    /// Reference name, as given.
    pub name: String,
    /// First position of interest (0-based, inclusive).
    pub start: Option<i64>,
    /// Last position of interest (0-based, inclusive).
    pub end: Option<i64>,
}

impl Region {
    /// Parses a region string against the reference dictionary.
    ///
    /// # Errors
    /// Returns [`GatacaError::InvalidRegion`] for malformed coordinates and
    /// [`GatacaError::ReferenceNotFound`] for an unknown reference name.
    pub fn parse(value: &str, reference: &ReferenceReader) -> Result<Self> {
        let invalid = |reason: &str| GatacaError::InvalidRegion {
            region: value.to_string(),
            reason: reason.to_string(),
        };

        let (name, bounds) = match value.rsplit_once(':') {
            Some((name, bounds)) if reference.reference_id(value).is_none() => {
                (name, Some(bounds))
            }
            _ => (value, None),
        };
        if name.is_empty() {
            return Err(invalid("reference name is empty"));
        }

        let id = reference
            .reference_id(name)
            .ok_or_else(|| GatacaError::ReferenceNotFound { ref_name: name.to_string() })?;

        let parse_coordinate = |text: &str, what: &str| -> Result<i64> {
            let cleaned = text.trim().replace(',', "");
            match cleaned.parse::<i64>() {
                Ok(v) if v >= 1 => Ok(v - 1),
                _ => Err(invalid(&format!("{what} must be a positive integer"))),
            }
        };

        let (start, end) = match bounds {
            None => (None, None),
            Some(bounds) => match bounds.split_once('-') {
                Some((s, e)) => (Some(parse_coordinate(s, "start")?), Some(parse_coordinate(e, "end")?)),
                None => (Some(parse_coordinate(bounds, "start")?), None),
            },
        };

        if let (Some(s), Some(e)) = (start, end) {
            if e < s {
                return Err(invalid("end precedes start"));
            }
        }

        Ok(Self { reference: id, name: name.to_string(), start, end })
    }

    /// True when the half-open span `[start, end)` on `reference` lies entirely outside.
    #[must_use]
    pub fn excludes_span(&self, reference: usize, start: i64, end: i64) -> bool {
        reference != self.reference
            || self.end.is_some_and(|e| e < start)
            || self.start.is_some_and(|s| end <= s)
    }

    /// True when the inclusive interval `[start, last]` on `reference` lies entirely outside.
    #[must_use]
    pub fn excludes_interval(&self, reference: usize, start: i64, last: i64) -> bool {
        self.excludes_span(reference, start, last + 1)
    }

    /// The region as a noodles query region (1-based).
    ///
    /// # Errors
    /// Returns an error if a bound cannot be represented as a position.
    pub fn to_query(&self) -> anyhow::Result<noodles::core::Region> {
        let to_position = |v: i64| -> anyhow::Result<Position> {
            Ok(Position::try_from(usize::try_from(v + 1)?)?)
        };
        let region = match (self.start, self.end) {
            (None, None) => noodles::core::Region::new(self.name.as_str(), ..),
            (Some(s), None) => noodles::core::Region::new(self.name.as_str(), to_position(s)?..),
            (None, Some(e)) => noodles::core::Region::new(self.name.as_str(), ..=to_position(e)?),
            (Some(s), Some(e)) => {
                noodles::core::Region::new(self.name.as_str(), to_position(s)?..=to_position(e)?)
            }
        };
        Ok(region)
    }
}
