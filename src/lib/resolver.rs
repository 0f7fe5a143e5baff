//! Resolution of mutually exclusive hypothesis groups.
//!
//! Every group produced by a geometry factory holds several explanations of one
//! observation, at most one of which is true. Members are indexed by their maximal span,
//! one index per reference. Later evidence that joins a member narrows it in place and
//! counts as a vote for it. Once all input has been seen, each group elects the member
//! with strictly the most votes.
//!
//! Ties are left unresolved, with one exception. When exactly one deletion and one
//! duplication tie, local coverage decides between them: a deletion lowers coverage and a
//! duplication raises it. The heuristic does not extend to any other tie.

use crate::interval_index::{IntervalIndex, Span};
use crate::sample::SampleStatistics;
use crate::variation::join::join;
use crate::variation::{Variation, VariationKind};
use ahash::AHashSet;
use log::debug;

/// Where an offered variation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A member of a newly produced hypothesis group.
    Group,
    /// An unambiguous variation from the pool.
    Pool,
}

/// A set of mutually exclusive variations and the votes each has collected.
#[derive(Debug, Clone)]
pub struct HypothesisGroup {
    members: Vec<Variation>,
    helpers: Vec<u32>,
}

impl HypothesisGroup {
    #[must_use]
    pub fn new(members: Vec<Variation>) -> Self {
        let helpers = vec![0; members.len()];
        Self { members, helpers }
    }

    /// Current members, narrowed by the evidence they absorbed.
    #[must_use]
    pub fn members(&self) -> &[Variation] {
        &self.members
    }

    /// Votes collected by each member.
    #[must_use]
    pub fn helpers(&self) -> &[u32] {
        &self.helpers
    }

    /// Index of the member with strictly the most votes.
    #[must_use]
    pub fn leader(&self) -> Option<usize> {
        let top = *self.helpers.iter().max()?;
        let mut leaders = self.tied_at(top);
        match (leaders.next(), leaders.next()) {
            (Some(idx), None) => Some(idx),
            _ => None,
        }
    }

    fn tied_at(&self, votes: u32) -> impl Iterator<Item = usize> + '_ {
        self.helpers.iter().enumerate().filter(move |&(_, &h)| h == votes).map(|(i, _)| i)
    }

    /// The winner of a deletion/duplication tie, decided by coverage.
    fn coverage_tie_break(&self, sample: &SampleStatistics) -> Option<usize> {
        let top = *self.helpers.iter().max()?;
        let tied: Vec<usize> = self.tied_at(top).collect();
        let &[a, b] = tied.as_slice() else { return None };
        let is_dup = |i: usize| {
            matches!(
                self.members[i].kind,
                VariationKind::Duplication | VariationKind::TandemDuplication
            )
        };
        let (del, dup) = match (self.members[a].kind, self.members[b].kind) {
            (VariationKind::Deletion, _) if is_dup(b) => (a, b),
            (_, VariationKind::Deletion) if is_dup(a) => (b, a),
            _ => return None,
        };

        let (min, max) = sample.coverage_bounds();
        let coverage_over = |v: &Variation| sample.coverage(v.reference, v.start, v.end);
        if coverage_over(&self.members[del]) < min as f64 {
            Some(del)
        } else if coverage_over(&self.members[dup]) > max as f64 {
            Some(dup)
        } else {
            None
        }
    }
}

/// Counts kept while resolving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// Groups stored for resolution.
    pub groups: u64,
    /// New groups folded into an existing group instead of being stored.
    pub absorbed_groups: u64,
    /// Pool variations that joined a group member.
    pub absorbed_pool: u64,
    /// Groups that elected a winner.
    pub winners: u64,
    /// Winners decided by coverage.
    pub tie_breaks: u64,
    /// Groups left without a winner.
    pub unresolved: u64,
}

/// Accumulates hypothesis groups and resolves them once input is exhausted.
#[derive(Debug, Default)]
pub struct AmbiguityResolver {
    groups: Vec<HypothesisGroup>,
    /// Per reference: member spans to `(group, member)`.
    indexes: Vec<IntervalIndex<(usize, usize)>>,
    stats: ResolverStats,
}

fn span_of(v: &Variation) -> Span {
    (v.max_start(), v.max_end())
}

impl AmbiguityResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Groups currently stored.
    #[must_use]
    pub fn groups(&self) -> &[HypothesisGroup] {
        &self.groups
    }

    fn index_mut(&mut self, reference: usize) -> &mut IntervalIndex<(usize, usize)> {
        if self.indexes.len() <= reference {
            self.indexes.resize_with(reference + 1, IntervalIndex::new);
        }
        &mut self.indexes[reference]
    }

    /// Joins `v` into every overlapping member it is compatible with. Returns whether it
    /// joined at least one.
    pub fn offer(&mut self, v: &Variation, origin: Origin) -> bool {
        let Some(index) = self.indexes.get(v.reference) else { return false };
        let keys = index.overlapping_keys(v.max_start() - 1, v.max_end() + 1);
        let mut touched = AHashSet::new();
        let mut absorbed = false;

        for key in keys {
            let entries = self.indexes[v.reference].get(key).to_vec();
            for (gid, idx) in entries {
                if !touched.insert((gid, idx)) {
                    continue;
                }
                let Some(joined) = join(&self.groups[gid].members[idx], v) else { continue };
                let new_key = span_of(&joined);
                let group = &mut self.groups[gid];
                group.members[idx] = joined;
                group.helpers[idx] += 1;
                absorbed = true;
                if new_key != key {
                    let index = self.index_mut(v.reference);
                    index.remove_where(key, |&entry| entry == (gid, idx));
                    index.insert(new_key.0, new_key.1, (gid, idx));
                }
            }
        }

        if absorbed && origin == Origin::Pool {
            self.stats.absorbed_pool += 1;
        }
        absorbed
    }

    /// Offers each member of a new group to the stored groups. The group is stored only
    /// when none of its members was absorbed. Returns whether it was stored.
    pub fn add_group(&mut self, members: Vec<Variation>) -> bool {
        let mut absorbed = false;
        for member in &members {
            absorbed |= self.offer(member, Origin::Group);
        }
        if absorbed {
            self.stats.absorbed_groups += 1;
            return false;
        }

        let gid = self.groups.len();
        for (idx, member) in members.iter().enumerate() {
            let (start, end) = span_of(member);
            self.index_mut(member.reference).insert(start, end, (gid, idx));
        }
        self.groups.push(HypothesisGroup::new(members));
        self.stats.groups += 1;
        true
    }

    /// Lets the pool vote, then elects a winner per group. Winners and every losing
    /// member go back into the pool; pool variations that voted are folded into the
    /// member they joined and leave the pool.
    pub fn resolve(&mut self, pool: &mut Vec<Variation>, sample: &SampleStatistics) {
        let offered = std::mem::take(pool);
        for v in offered {
            if v.kind != VariationKind::Snp && self.offer(&v, Origin::Pool) {
                continue;
            }
            pool.push(v);
        }

        for group in std::mem::take(&mut self.groups) {
            let winner = match group.leader() {
                Some(idx) => Some(idx),
                None => {
                    let tie_break = group.coverage_tie_break(sample);
                    if tie_break.is_some() {
                        self.stats.tie_breaks += 1;
                    }
                    tie_break
                }
            };
            match winner {
                Some(idx) => {
                    self.stats.winners += 1;
                    debug!(
                        "Group resolved to {} at {}:{} with {} votes",
                        group.members[idx].kind,
                        group.members[idx].reference,
                        group.members[idx].start,
                        group.helpers[idx]
                    );
                }
                None => self.stats.unresolved += 1,
            }
            pool.extend(group.members);
        }
        self.indexes.clear();
    }
}
