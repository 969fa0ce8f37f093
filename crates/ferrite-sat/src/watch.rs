//! Per-literal watch lists.
//!
//! A watcher is two 32-bit words. For a long clause it carries the arena
//! handle plus a blocker literal used as a satisfaction fast path; for a
//! binary clause it carries the other literal inline, so propagation over
//! binaries never touches the arena. Binary clauses exist *only* here:
//! the watcher pair in the two lists of `{a, b}` is the clause.
//!
//! The propagator rewrites a list in place while scanning it (read
//! cursor ahead of a write cursor, terminal truncation); [`WatchLists::raw`]
//! exposes the list for that idiom. Bulk removals mark lists smudged and
//! [`WatchLists::clean_smudged`] compacts them in one pass.

use crate::arena::{ClauseArena, ClauseRef};
use crate::literal::Literal;

const BINARY_FLAG: u32 = 1 << 31;
const BINARY_REDUNDANT: u32 = 1 << 30;

/// One watch-list entry; see the module docs for the two variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watcher {
    payload: u32,
    blocker: Literal,
}

impl Watcher {
    /// Watcher for a long clause with a blocker hint.
    #[inline]
    pub fn long(clause: ClauseRef, blocker: Literal) -> Watcher {
        debug_assert!(clause.0 & (BINARY_FLAG | BINARY_REDUNDANT) == 0);
        Watcher {
            payload: clause.0,
            blocker,
        }
    }

    /// Watcher representing one half of a binary clause; `other` is the
    /// remaining literal.
    #[inline]
    pub fn binary(other: Literal, redundant: bool) -> Watcher {
        Watcher {
            payload: BINARY_FLAG | if redundant { BINARY_REDUNDANT } else { 0 },
            blocker: other,
        }
    }

    /// Whether this entry is an inline binary clause.
    #[inline]
    pub fn is_binary(self) -> bool {
        self.payload & BINARY_FLAG != 0
    }

    /// Redundancy flag of a binary entry.
    #[inline]
    pub fn binary_redundant(self) -> bool {
        debug_assert!(self.is_binary());
        self.payload & BINARY_REDUNDANT != 0
    }

    /// Promote a redundant binary to irredundant in place.
    #[inline]
    pub fn promote_binary(&mut self) {
        debug_assert!(self.is_binary());
        self.payload &= !BINARY_REDUNDANT;
    }

    /// Arena handle of a long-clause entry.
    #[inline]
    pub fn clause(self) -> ClauseRef {
        debug_assert!(!self.is_binary());
        ClauseRef(self.payload)
    }

    /// Rewrite the arena handle (after consolidation).
    #[inline]
    pub fn set_clause(&mut self, clause: ClauseRef) {
        debug_assert!(!self.is_binary());
        self.payload = clause.0;
    }

    /// Blocker of a long entry, or the other literal of a binary entry.
    #[inline]
    pub fn blocker(self) -> Literal {
        self.blocker
    }

    /// The other literal of a binary entry (alias of [`Watcher::blocker`]
    /// that reads better at call sites).
    #[inline]
    pub fn other(self) -> Literal {
        debug_assert!(self.is_binary());
        self.blocker
    }

    /// Update the blocker hint of a long entry.
    #[inline]
    pub fn set_blocker(&mut self, blocker: Literal) {
        self.blocker = blocker;
    }
}

/// All watch lists, indexed by the encoding of the watched literal.
///
/// `lists[l]` holds the clauses in which literal `l` is watched; the list
/// is scanned when `l` becomes false.
#[derive(Debug, Default)]
pub struct WatchLists {
    lists: Vec<Vec<Watcher>>,
    dirty: Vec<bool>,
    smudged: Vec<Literal>,
}

impl WatchLists {
    /// Grow to cover `num_vars` variables.
    pub fn ensure_vars(&mut self, num_vars: usize) {
        let want = num_vars * 2;
        if self.lists.len() < want {
            self.lists.resize_with(want, Vec::new);
            self.dirty.resize(want, false);
        }
    }

    /// Append a watcher to a literal's list.
    #[inline]
    pub fn push(&mut self, lit: Literal, watcher: Watcher) {
        self.lists[lit.index()].push(watcher);
    }

    /// Register a binary clause `{a, b}` in both of its lists.
    pub fn add_binary(&mut self, a: Literal, b: Literal, redundant: bool) {
        self.push(a, Watcher::binary(b, redundant));
        self.push(b, Watcher::binary(a, redundant));
    }

    /// Eagerly remove the binary `{a, b}` from both lists.
    ///
    /// Returns true when the pair was present (it is removed from both
    /// sides or neither).
    pub fn remove_binary(&mut self, a: Literal, b: Literal) -> bool {
        let la = &mut self.lists[a.index()];
        let Some(pa) = la.iter().position(|w| w.is_binary() && w.other() == b) else {
            return false;
        };
        la.swap_remove(pa);
        let lb = &mut self.lists[b.index()];
        let pb = lb
            .iter()
            .position(|w| w.is_binary() && w.other() == a)
            .expect("binary watcher present on one side only");
        lb.swap_remove(pb);
        true
    }

    /// Shared view of a literal's list.
    #[inline]
    pub fn list(&self, lit: Literal) -> &[Watcher] {
        &self.lists[lit.index()]
    }

    /// Mutable list access for passes that rewrite watchers wholesale.
    #[inline]
    pub fn list_mut(&mut self, lit: Literal) -> &mut Vec<Watcher> {
        &mut self.lists[lit.index()]
    }

    /// Raw view for the propagator's in-place rewrite: a pointer/length
    /// pair valid until the list is pushed to or truncated.
    ///
    /// The propagator only ever appends to *other* literals' lists while
    /// scanning this one, which leaves the view stable.
    #[inline]
    pub fn raw(&mut self, lit: Literal) -> (*mut Watcher, usize) {
        let list = &mut self.lists[lit.index()];
        (list.as_mut_ptr(), list.len())
    }

    /// Drop the tail of a list after an in-place rewrite kept `len` entries.
    #[inline]
    pub fn truncate(&mut self, lit: Literal, len: usize) {
        self.lists[lit.index()].truncate(len);
    }

    /// Mark a list as containing watchers of freed clauses.
    #[inline]
    pub fn smudge(&mut self, lit: Literal) {
        if !self.dirty[lit.index()] {
            self.dirty[lit.index()] = true;
            self.smudged.push(lit);
        }
    }

    /// Compact every smudged list, dropping watchers whose clause was
    /// freed in the arena. Binary entries are never dropped here; they
    /// are removed eagerly via [`WatchLists::remove_binary`].
    pub fn clean_smudged(&mut self, arena: &ClauseArena) {
        let smudged = std::mem::take(&mut self.smudged);
        for lit in smudged {
            self.dirty[lit.index()] = false;
            self.lists[lit.index()]
                .retain(|w| w.is_binary() || !arena.is_removed(w.clause()));
        }
    }

    /// Rewrite all long handles after an arena consolidation. Watchers of
    /// clauses missing from the remap (freed before the consolidate) are
    /// dropped.
    pub fn remap_longs(&mut self, remap: &rustc_hash::FxHashMap<u32, u32>) {
        for list in &mut self.lists {
            list.retain_mut(|w| {
                if w.is_binary() {
                    return true;
                }
                match remap.get(&w.clause().0) {
                    Some(&fresh) => {
                        w.set_clause(ClauseRef(fresh));
                        true
                    }
                    None => false,
                }
            });
        }
        self.dirty.iter_mut().for_each(|d| *d = false);
        self.smudged.clear();
    }

    /// Enumerate each binary clause exactly once as `(min, max, redundant)`
    /// by literal encoding.
    pub fn binaries(&self) -> Vec<(Literal, Literal, bool)> {
        let mut out = Vec::new();
        for (idx, list) in self.lists.iter().enumerate() {
            let lit = Literal::from_index(idx);
            for w in list {
                if w.is_binary() && lit < w.other() {
                    out.push((lit, w.other(), w.binary_redundant()));
                }
            }
        }
        out
    }

    /// Drop every watcher (used by full rebuilds such as renumbering).
    pub fn clear_all(&mut self) {
        for list in &mut self.lists {
            list.clear();
        }
        self.dirty.iter_mut().for_each(|d| *d = false);
        self.smudged.clear();
    }

    /// Number of watch lists (twice the covered variable count).
    pub fn num_lists(&self) -> usize {
        self.lists.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Variable;

    fn lit(v: u32, pos: bool) -> Literal {
        Variable(v).literal(pos)
    }

    #[test]
    fn binary_watcher_carries_other_and_flag() {
        let w = Watcher::binary(lit(3, false), true);
        assert!(w.is_binary());
        assert!(w.binary_redundant());
        assert_eq!(w.other(), lit(3, false));
        let mut w = w;
        w.promote_binary();
        assert!(!w.binary_redundant());
        assert!(w.is_binary());
    }

    #[test]
    fn long_watcher_round_trips_handle() {
        let mut w = Watcher::long(ClauseRef(17), lit(0, true));
        assert!(!w.is_binary());
        assert_eq!(w.clause(), ClauseRef(17));
        w.set_clause(ClauseRef(23));
        w.set_blocker(lit(1, false));
        assert_eq!(w.clause(), ClauseRef(23));
        assert_eq!(w.blocker(), lit(1, false));
    }

    #[test]
    fn binary_lives_in_both_lists_until_removed() {
        let mut watches = WatchLists::default();
        watches.ensure_vars(4);
        watches.add_binary(lit(0, true), lit(1, false), false);
        assert_eq!(watches.list(lit(0, true)).len(), 1);
        assert_eq!(watches.list(lit(1, false)).len(), 1);
        assert_eq!(watches.binaries(), vec![(lit(0, true), lit(1, false), false)]);

        assert!(watches.remove_binary(lit(1, false), lit(0, true)));
        assert!(watches.list(lit(0, true)).is_empty());
        assert!(watches.list(lit(1, false)).is_empty());
        assert!(!watches.remove_binary(lit(1, false), lit(0, true)));
    }

    #[test]
    fn clean_smudged_drops_freed_clauses_only() {
        let mut arena = ClauseArena::new();
        let body: Vec<Literal> = vec![lit(0, true), lit(1, true), lit(2, true)];
        let keep = arena.alloc(&body, false, 1).unwrap();
        let gone = arena.alloc(&body, false, 2).unwrap();

        let mut watches = WatchLists::default();
        watches.ensure_vars(3);
        watches.push(lit(0, true), Watcher::long(keep, lit(1, true)));
        watches.push(lit(0, true), Watcher::long(gone, lit(1, true)));
        watches.add_binary(lit(0, true), lit(2, true), true);

        arena.free(gone);
        watches.smudge(lit(0, true));
        watches.smudge(lit(0, true)); // idempotent
        watches.clean_smudged(&arena);

        let left = watches.list(lit(0, true));
        assert_eq!(left.len(), 2);
        assert!(left.iter().any(|w| !w.is_binary() && w.clause() == keep));
        assert!(left.iter().any(|w| w.is_binary()));
    }
}
