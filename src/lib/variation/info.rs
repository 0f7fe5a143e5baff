//! Confidence and bookkeeping fields attached to a variation.
//!
//! Breakpoint confidence is stored as offsets relative to the called position: `cpos`
//! (never positive) widens the start to the left, `cend` (never negative) widens the end
//! to the right. A missing offset means the breakpoint is exact. The same convention holds
//! for the target locus of a translocation, where a side may also be unbounded.

use std::fmt;

/// A one-sided confidence offset for a translocation target breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slack {
    /// The breakpoint lies within this many bases of the called position.
    Bounded(i64),
    /// The breakpoint may lie anywhere on that side.
    Open,
}

impl fmt::Display for Slack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slack::Bounded(v) => write!(f, "{v}"),
            Slack::Open => write!(f, "."),
        }
    }
}

/// An inclusive length range whose upper bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRange {
    pub min: i64,
    pub max: Option<i64>,
}

impl LengthRange {
    #[must_use]
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max: Some(max) }
    }

    /// A range bounded only from below.
    #[must_use]
    pub fn at_least(min: i64) -> Self {
        Self { min, max: None }
    }

    #[must_use]
    pub fn exact(len: i64) -> Self {
        Self::new(len, len)
    }

    /// Intersects two ranges. Disjoint ranges collapse onto the larger lower bound.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let min = self.min.max(other.min);
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match max {
            Some(max) if max < min => Self::exact(min),
            _ => Self { min, max },
        }
    }
}

impl fmt::Display for LengthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{},{max}", self.min),
            None => write!(f, "{},.", self.min),
        }
    }
}

/// The locus a translocated sequence was copied from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub reference: usize,
    /// First base of the translocated sequence (0-based).
    pub pos: i64,
    /// Last base of the translocated sequence (0-based).
    pub end: i64,
    pub cpos: Option<Slack>,
    pub cend: Option<Slack>,
}

impl Target {
    #[must_use]
    pub fn new(reference: usize, pos: i64, end: i64) -> Self {
        Self { reference, pos, end, cpos: None, cend: None }
    }

    #[must_use]
    pub fn with_confidence(mut self, cpos: Slack, cend: Slack) -> Self {
        self.cpos = Some(cpos);
        self.cend = Some(cend);
        self
    }

    /// Leftmost possible start, `None` when unbounded.
    #[must_use]
    pub fn max_start(&self) -> Option<i64> {
        match self.cpos {
            Some(Slack::Open) => None,
            Some(Slack::Bounded(v)) => Some(self.pos + v),
            None => Some(self.pos),
        }
    }

    /// Rightmost possible end, `None` when unbounded.
    #[must_use]
    pub fn max_end(&self) -> Option<i64> {
        match self.cend {
            Some(Slack::Open) => None,
            Some(Slack::Bounded(v)) => Some(self.end + v),
            None => Some(self.end),
        }
    }

    /// Range of possible lengths of the translocated sequence.
    #[must_use]
    pub fn length_range(&self) -> LengthRange {
        let min = self.end - self.pos;
        match (self.max_start(), self.max_end()) {
            (Some(s), Some(e)) => LengthRange::new(min, e - s),
            _ => LengthRange::at_least(min),
        }
    }
}

/// Confidence fields of one variation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Info {
    pub cpos: Option<i64>,
    pub cend: Option<i64>,
    pub svlen: Option<i64>,
    pub cilen: Option<LengthRange>,
    pub target: Option<Target>,
    pub depth: u32,
    pub imprecise: bool,
}

impl Default for Info {
    fn default() -> Self {
        Self::exact()
    }
}

impl Info {
    /// Exact breakpoints, depth 1.
    #[must_use]
    pub fn exact() -> Self {
        Self { cpos: None, cend: None, svlen: None, cilen: None, target: None, depth: 1, imprecise: false }
    }

    #[must_use]
    pub fn cpos(mut self, cpos: i64) -> Self {
        self.cpos = Some(cpos);
        self
    }

    #[must_use]
    pub fn cend(mut self, cend: i64) -> Self {
        self.cend = Some(cend);
        self
    }

    #[must_use]
    pub fn svlen(mut self, svlen: i64) -> Self {
        self.svlen = Some(svlen);
        self
    }

    #[must_use]
    pub fn cilen(mut self, cilen: LengthRange) -> Self {
        self.cilen = Some(cilen);
        self
    }

    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// The known length range: `cilen`, else the exact `svlen`, else nothing.
    #[must_use]
    pub fn length_range(&self) -> Option<LengthRange> {
        self.cilen.or(self.svlen.map(LengthRange::exact))
    }

    /// Drops offsets that point the wrong way or widen nothing, keeps the start
    /// confidence on the genome, collapses a degenerate length range into `svlen`
    /// and recomputes `imprecise`.
    pub fn normalize(&mut self, start: i64) {
        if self.cpos.is_some_and(|v| v >= 0) {
            self.cpos = None;
        }
        if self.cend.is_some_and(|v| v <= 0) {
            self.cend = None;
        }
        if let Some(cpos) = self.cpos {
            if start + cpos < 0 {
                self.cpos = if start > 0 { Some(-start) } else { None };
            }
        }

        if let Some(target) = self.target.as_mut() {
            if matches!(target.cpos, Some(Slack::Bounded(v)) if v >= 0) {
                target.cpos = None;
            }
            if matches!(target.cend, Some(Slack::Bounded(v)) if v <= 0) {
                target.cend = None;
            }
        }

        if let Some(LengthRange { min, max: Some(max) }) = self.cilen {
            if min == max {
                if min != 0 {
                    self.svlen = Some(min);
                }
                self.cilen = None;
            }
        }

        self.imprecise = self.cpos.is_some()
            || self.cend.is_some()
            || self.cilen.is_some()
            || self.target.as_ref().is_some_and(|t| t.cpos.is_some() || t.cend.is_some());
    }
}
