//! Slab storage for long clauses.
//!
//! Clause bodies live in one bump-allocated vector of 32-bit words; a
//! [`ClauseRef`] is the word offset of the clause header. Every other
//! component holds these offsets, which keeps watch entries at two words
//! and survives database growth without pointer chasing.
//!
//! Freeing only marks a clause and accounts the waste; space comes back
//! in bulk when [`ClauseArena::consolidate`] copies the live clauses into
//! a fresh slab and hands the caller a remap for every handle it holds.
//!
//! Header layout, in words:
//!
//! ```text
//! [0] size << 4 | flags     (redundant / removed / distilled / used)
//! [1] glue (LBD)
//! [2] activity (f32 bits)
//! [3] id low word
//! [4] id high word
//! [5..5+size] literals
//! ```

use rustc_hash::FxHashMap;

use crate::config::{Error, Result};
use crate::literal::Literal;

/// Stable handle to a clause in the arena: the word offset of its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClauseRef(pub u32);

const HEADER_WORDS: usize = 5;

const FLAG_REDUNDANT: u32 = 1;
const FLAG_REMOVED: u32 = 2;
const FLAG_DISTILLED: u32 = 4;
const FLAG_USED: u32 = 8;
const FLAG_BITS: u32 = 4;
const FLAG_MASK: u32 = (1 << FLAG_BITS) - 1;

/// Clauses longer than this cannot be represented in the header.
pub const MAX_CLAUSE_LEN: usize = 1 << 28;

/// Redundant-clause tier, derived from glue.
///
/// Core clauses are never deleted in-run; mid-tier clauses survive a
/// sweep when they were used since the last one; local clauses live on
/// activity alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Glue at or below the (adaptive) core cutoff.
    Core,
    /// Glue above the core cutoff, at or below [`MID_TIER_GLUE`].
    Mid,
    /// Everything else; aggressively culled.
    Local,
}

/// Upper glue bound of the mid tier.
pub const MID_TIER_GLUE: u32 = 6;

/// Bump-allocated clause storage.
#[derive(Debug, Default)]
pub struct ClauseArena {
    words: Vec<u32>,
    wasted: usize,
    live: usize,
}

impl ClauseArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        ClauseArena::default()
    }

    /// Number of live (not freed) clauses.
    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Fraction of allocated words belonging to freed clauses.
    pub fn wasted_fraction(&self) -> f64 {
        if self.words.is_empty() {
            0.0
        } else {
            self.wasted as f64 / self.words.len() as f64
        }
    }

    /// Capacity gate, on the clause length alone: the header stores 28
    /// bits of size and handles are 32-bit word offsets.
    fn check_capacity(&self, len: usize) -> Result<()> {
        if len >= MAX_CLAUSE_LEN {
            return Err(Error::ClauseTooLong(len));
        }
        if self.words.len() + HEADER_WORDS + len > u32::MAX as usize {
            return Err(Error::ArenaExhausted);
        }
        Ok(())
    }

    /// Allocate a clause and write its header and literals.
    ///
    /// The id is assigned by the caller (the solver keeps the monotone
    /// counter so that binaries and units share the same id space).
    pub fn alloc(&mut self, lits: &[Literal], redundant: bool, id: u64) -> Result<ClauseRef> {
        self.check_capacity(lits.len())?;
        let offset = self.words.len();
        let flags = if redundant { FLAG_REDUNDANT } else { 0 };
        self.words.push((lits.len() as u32) << FLAG_BITS | flags);
        self.words.push(0); // glue
        self.words.push(0f32.to_bits());
        self.words.push(id as u32);
        self.words.push((id >> 32) as u32);
        self.words.extend(lits.iter().map(|l| l.0));
        self.live += 1;
        Ok(ClauseRef(offset as u32))
    }

    #[inline]
    fn header(&self, c: ClauseRef) -> u32 {
        self.words[c.0 as usize]
    }

    /// Number of literals in the clause.
    #[inline]
    pub fn len(&self, c: ClauseRef) -> usize {
        (self.header(c) >> FLAG_BITS) as usize
    }

    /// True when the arena holds no clauses at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The literals of the clause.
    #[inline]
    pub fn lits(&self, c: ClauseRef) -> &[Literal] {
        let start = c.0 as usize + HEADER_WORDS;
        let words = &self.words[start..start + self.len(c)];
        // Literal is repr(transparent) over u32, so the word slice and the
        // literal slice have identical layout.
        unsafe { &*(words as *const [u32] as *const [Literal]) }
    }

    /// Mutable view of the literals (used by in-place rewrites such as
    /// watch rotation and equivalence substitution).
    #[inline]
    pub fn lits_mut(&mut self, c: ClauseRef) -> &mut [Literal] {
        let start = c.0 as usize + HEADER_WORDS;
        let len = self.len(c);
        let words = &mut self.words[start..start + len];
        unsafe { &mut *(words as *mut [u32] as *mut [Literal]) }
    }

    #[inline]
    fn flag(&self, c: ClauseRef, flag: u32) -> bool {
        self.header(c) & flag != 0
    }

    #[inline]
    fn set_flag(&mut self, c: ClauseRef, flag: u32, on: bool) {
        let w = &mut self.words[c.0 as usize];
        if on {
            *w |= flag;
        } else {
            *w &= !flag;
        }
    }

    /// Whether the clause is redundant (learned).
    #[inline]
    pub fn is_redundant(&self, c: ClauseRef) -> bool {
        self.flag(c, FLAG_REDUNDANT)
    }

    /// Demote a redundant clause to irredundant (subsumption promotion).
    #[inline]
    pub fn set_irredundant(&mut self, c: ClauseRef) {
        self.set_flag(c, FLAG_REDUNDANT, false);
    }

    /// Whether the clause was freed and awaits consolidation.
    #[inline]
    pub fn is_removed(&self, c: ClauseRef) -> bool {
        self.flag(c, FLAG_REMOVED)
    }

    /// Whether distillation already visited this clause.
    #[inline]
    pub fn is_distilled(&self, c: ClauseRef) -> bool {
        self.flag(c, FLAG_DISTILLED)
    }

    /// Mark the clause as visited by distillation.
    #[inline]
    pub fn mark_distilled(&mut self, c: ClauseRef) {
        self.set_flag(c, FLAG_DISTILLED, true);
    }

    /// Set the use bit (clause served as antecedent since the last sweep).
    #[inline]
    pub fn mark_used(&mut self, c: ClauseRef) {
        self.set_flag(c, FLAG_USED, true);
    }

    /// Read and clear the use bit.
    #[inline]
    pub fn take_used(&mut self, c: ClauseRef) -> bool {
        let was = self.flag(c, FLAG_USED);
        self.set_flag(c, FLAG_USED, false);
        was
    }

    /// Glue (LBD) recorded for the clause.
    #[inline]
    pub fn glue(&self, c: ClauseRef) -> u32 {
        self.words[c.0 as usize + 1]
    }

    /// Record a new glue value.
    #[inline]
    pub fn set_glue(&mut self, c: ClauseRef, glue: u32) {
        self.words[c.0 as usize + 1] = glue;
    }

    /// Activity score of the clause.
    #[inline]
    pub fn activity(&self, c: ClauseRef) -> f32 {
        f32::from_bits(self.words[c.0 as usize + 2])
    }

    /// Overwrite the activity score.
    #[inline]
    pub fn set_activity(&mut self, c: ClauseRef, activity: f32) {
        self.words[c.0 as usize + 2] = activity.to_bits();
    }

    /// Unique 64-bit id, stable across consolidation.
    #[inline]
    pub fn id(&self, c: ClauseRef) -> u64 {
        let lo = self.words[c.0 as usize + 3] as u64;
        let hi = self.words[c.0 as usize + 4] as u64;
        hi << 32 | lo
    }

    /// Tier of a redundant clause under the given core cutoff.
    #[inline]
    pub fn tier(&self, c: ClauseRef, core_cutoff: u32) -> Tier {
        let glue = self.glue(c);
        if glue <= core_cutoff {
            Tier::Core
        } else if glue <= MID_TIER_GLUE {
            Tier::Mid
        } else {
            Tier::Local
        }
    }

    /// Mark the clause freed. The words stay in place (walks still need
    /// the header) until the next consolidation.
    pub fn free(&mut self, c: ClauseRef) {
        debug_assert!(!self.is_removed(c));
        self.set_flag(c, FLAG_REMOVED, true);
        self.wasted += HEADER_WORDS + self.len(c);
        self.live -= 1;
    }

    /// Iterate the handles of all live clauses in allocation order.
    pub fn refs(&self) -> LiveRefs<'_> {
        LiveRefs {
            arena: self,
            offset: 0,
        }
    }

    /// Copy every live clause into a fresh slab.
    ///
    /// Returns the old-offset → new-offset remap; the caller must rewrite
    /// every handle it holds (watch lists, antecedents, bookkeeping).
    /// Clause ids and relative order are preserved.
    pub fn consolidate(&mut self) -> FxHashMap<u32, u32> {
        let mut remap = FxHashMap::default();
        let mut fresh = Vec::with_capacity(self.words.len() - self.wasted);
        let mut offset = 0usize;
        while offset < self.words.len() {
            let header = self.words[offset];
            let size = (header >> FLAG_BITS) as usize;
            let total = HEADER_WORDS + size;
            if header & FLAG_REMOVED == 0 {
                remap.insert(offset as u32, fresh.len() as u32);
                fresh.extend_from_slice(&self.words[offset..offset + total]);
            }
            offset += total;
        }
        self.words = fresh;
        self.wasted = 0;
        remap
    }
}

/// Iterator over live clause handles; see [`ClauseArena::refs`].
pub struct LiveRefs<'a> {
    arena: &'a ClauseArena,
    offset: usize,
}

impl Iterator for LiveRefs<'_> {
    type Item = ClauseRef;

    fn next(&mut self) -> Option<ClauseRef> {
        while self.offset < self.arena.words.len() {
            let header = self.arena.words[self.offset];
            let size = (header >> FLAG_BITS) as usize;
            let at = self.offset;
            self.offset += HEADER_WORDS + size;
            if header & FLAG_REMOVED == 0 {
                return Some(ClauseRef(at as u32));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Variable;
    use proptest::prelude::*;

    fn lits(pattern: &[(u32, bool)]) -> Vec<Literal> {
        pattern
            .iter()
            .map(|&(v, pos)| Variable(v).literal(pos))
            .collect()
    }

    #[test]
    fn alloc_then_read_back() {
        let mut arena = ClauseArena::new();
        let body = lits(&[(0, true), (1, false), (2, true)]);
        let c = arena.alloc(&body, true, 42).unwrap();
        assert_eq!(arena.lits(c), body.as_slice());
        assert_eq!(arena.len(c), 3);
        assert_eq!(arena.id(c), 42);
        assert!(arena.is_redundant(c));
        assert!(!arena.is_removed(c));
    }

    #[test]
    fn free_accounts_waste_and_consolidate_reclaims() {
        let mut arena = ClauseArena::new();
        let a = arena.alloc(&lits(&[(0, true), (1, true), (2, true)]), false, 1).unwrap();
        let b = arena.alloc(&lits(&[(3, true), (4, true), (5, true)]), false, 2).unwrap();
        let body_b = arena.lits(b).to_vec();

        arena.free(a);
        assert!(arena.wasted_fraction() > 0.4);
        assert_eq!(arena.refs().collect::<Vec<_>>(), vec![b]);

        let remap = arena.consolidate();
        assert!(!remap.contains_key(&a.0));
        let nb = ClauseRef(remap[&b.0]);
        assert_eq!(arena.lits(nb), body_b.as_slice());
        assert_eq!(arena.id(nb), 2);
        assert_eq!(arena.wasted_fraction(), 0.0);
    }

    #[test]
    fn oversized_clause_is_a_capacity_error() {
        // The gate consults only the length, so the 2^28 boundary is
        // testable without materializing a gigabyte of literals.
        let arena = ClauseArena::new();
        assert!(matches!(
            arena.check_capacity(MAX_CLAUSE_LEN),
            Err(crate::config::Error::ClauseTooLong(_))
        ));
        assert!(arena.check_capacity(MAX_CLAUSE_LEN - 1).is_ok());
    }

    #[test]
    fn use_bit_is_read_once() {
        let mut arena = ClauseArena::new();
        let c = arena.alloc(&lits(&[(0, true), (1, true), (2, true)]), true, 7).unwrap();
        assert!(!arena.take_used(c));
        arena.mark_used(c);
        assert!(arena.take_used(c));
        assert!(!arena.take_used(c));
    }

    #[test]
    fn tiers_follow_glue() {
        let mut arena = ClauseArena::new();
        let c = arena.alloc(&lits(&[(0, true), (1, true), (2, true)]), true, 1).unwrap();
        arena.set_glue(c, 2);
        assert_eq!(arena.tier(c, 2), Tier::Core);
        arena.set_glue(c, 5);
        assert_eq!(arena.tier(c, 2), Tier::Mid);
        arena.set_glue(c, 9);
        assert_eq!(arena.tier(c, 2), Tier::Local);
        // Lowering the cutoff demotes what used to be core.
        arena.set_glue(c, 2);
        assert_eq!(arena.tier(c, 1), Tier::Mid);
    }

    proptest! {
        #[test]
        fn walk_preserves_allocation_order(sizes in proptest::collection::vec(3usize..10, 1..20)) {
            let mut arena = ClauseArena::new();
            let mut handles = Vec::new();
            for (i, &sz) in sizes.iter().enumerate() {
                let body: Vec<Literal> =
                    (0..sz).map(|k| Variable(k as u32).literal(i % 2 == 0)).collect();
                handles.push(arena.alloc(&body, false, i as u64).unwrap());
            }
            prop_assert_eq!(arena.refs().collect::<Vec<_>>(), handles.clone());
            // Ids survive a consolidate with nothing freed.
            let remap = arena.consolidate();
            for (i, h) in handles.iter().enumerate() {
                let nh = ClauseRef(remap[&h.0]);
                prop_assert_eq!(arena.id(nh), i as u64);
            }
        }
    }
}
