//! An ordered index of closed intervals with overlap queries.
//!
//! Items are bucketed under their `(start, end)` key in a `BTreeMap`. The index tracks the
//! longest interval it has ever held, which bounds how far left of a query an overlapping
//! key can start, so an overlap query is a single range scan over the map. Items can be
//! removed and re-inserted under a new key when their span changes.
//!
//! # Example
//!
//! ```
//! use gataca_lib::interval_index::IntervalIndex;
//!
//! let mut index = IntervalIndex::new();
//! index.insert(100, 200, "a");
//! index.insert(150, 160, "b");
//! index.insert(300, 400, "c");
//!
//! assert_eq!(index.overlapping_keys(190, 310), vec![(100, 200), (300, 400)]);
//! assert_eq!(index.remove_where((150, 160), |v| *v == "b"), Some("b"));
//! assert_eq!(index.len(), 2);
//! ```

use std::collections::BTreeMap;

/// Closed `[start, end]` key.
pub type Span = (i64, i64);

/// Interval-keyed buckets of items.
#[derive(Debug, Clone)]
pub struct IntervalIndex<T> {
    buckets: BTreeMap<Span, Vec<T>>,
    /// Length of the longest span ever inserted.
    longest: i64,
    len: usize,
}

impl<T> Default for IntervalIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntervalIndex<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { buckets: BTreeMap::new(), longest: 0, len: 0 }
    }

    /// Adds `item` under `[start, end]`, sharing the bucket with any item already there.
    pub fn insert(&mut self, start: i64, end: i64, item: T) {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        self.longest = self.longest.max(end - start);
        self.buckets.entry((start, end)).or_default().push(item);
        self.len += 1;
    }

    /// Keys of all buckets whose span shares at least one position with `[start, end]`,
    /// in key order.
    #[must_use]
    pub fn overlapping_keys(&self, start: i64, end: i64) -> Vec<Span> {
        let from = (start.saturating_sub(self.longest), i64::MIN);
        let to = (end, i64::MAX);
        if from > to {
            return Vec::new();
        }
        self.buckets.range(from..=to).map(|(k, _)| *k).filter(|k| k.1 >= start).collect()
    }

    /// Items stored at `key`.
    #[must_use]
    pub fn get(&self, key: Span) -> &[T] {
        self.buckets.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Removes the first item at `key` matching `predicate`.
    pub fn remove_where(&mut self, key: Span, predicate: impl Fn(&T) -> bool) -> Option<T> {
        let bucket = self.buckets.get_mut(&key)?;
        let idx = bucket.iter().position(predicate)?;
        let item = bucket.swap_remove(idx);
        if bucket.is_empty() {
            self.buckets.remove(&key);
        }
        self.len -= 1;
        Some(item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
