//! The assignment trail and decision levels.
//!
//! One owner for everything the implication graph needs: the three-valued
//! assignment, the per-variable decision level and antecedent, the
//! append-only trail, the level separators, and the propagation head.
//! `value(lit) = Some(true)` exactly when `lit` sits on the trail.

use crate::arena::ClauseRef;
use crate::literal::{Literal, Variable};

/// Why a variable holds its current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Antecedent {
    /// Branching decision (or assumption), no reason clause.
    Decision,
    /// Propagated by a long clause.
    Clause(ClauseRef),
    /// Propagated by the binary clause `{lit, other}`; the payload is the
    /// other literal, which together with the propagated one *is* the clause.
    Binary(Literal),
}

/// Ordered assignment history with decision-level marks.
#[derive(Debug, Default)]
pub struct Trail {
    values: Vec<Option<bool>>,
    level: Vec<u32>,
    reason: Vec<Antecedent>,
    trail: Vec<Literal>,
    lim: Vec<usize>,
    qhead: usize,
}

impl Trail {
    /// Grow to cover `num_vars` variables.
    pub fn ensure_vars(&mut self, num_vars: usize) {
        if self.values.len() < num_vars {
            self.values.resize(num_vars, None);
            self.level.resize(num_vars, 0);
            self.reason.resize(num_vars, Antecedent::Decision);
        }
    }

    /// Number of variables covered.
    #[inline]
    pub fn num_vars(&self) -> usize {
        self.values.len()
    }

    /// Value of a variable.
    #[inline]
    pub fn var_value(&self, var: Variable) -> Option<bool> {
        self.values[var.index()]
    }

    /// Value of a literal under the current assignment.
    #[inline]
    pub fn value(&self, lit: Literal) -> Option<bool> {
        self.values[lit.variable().index()].map(|v| v == lit.is_positive())
    }

    /// Whether the literal is assigned true.
    #[inline]
    pub fn is_true(&self, lit: Literal) -> bool {
        self.value(lit) == Some(true)
    }

    /// Whether the literal is assigned false.
    #[inline]
    pub fn is_false(&self, lit: Literal) -> bool {
        self.value(lit) == Some(false)
    }

    /// Decision level at which the variable was assigned.
    #[inline]
    pub fn level_of(&self, var: Variable) -> u32 {
        self.level[var.index()]
    }

    /// Antecedent of the variable's assignment.
    #[inline]
    pub fn reason_of(&self, var: Variable) -> Antecedent {
        self.reason[var.index()]
    }

    /// Rewrite a clause antecedent (arena consolidation remap).
    #[inline]
    pub fn set_reason(&mut self, var: Variable, reason: Antecedent) {
        self.reason[var.index()] = reason;
    }

    /// Assigned at level 0, hence permanent.
    #[inline]
    pub fn is_fixed(&self, var: Variable) -> bool {
        self.values[var.index()].is_some() && self.level[var.index()] == 0
    }

    /// Current decision level.
    #[inline]
    pub fn decision_level(&self) -> u32 {
        self.lim.len() as u32
    }

    /// Open a new decision level.
    pub fn new_level(&mut self) {
        self.lim.push(self.trail.len());
    }

    /// Trail index at which the given level begins.
    #[inline]
    pub fn level_start(&self, level: u32) -> usize {
        if level == 0 {
            0
        } else {
            self.lim[level as usize - 1]
        }
    }

    /// Append an assignment. The literal must be unassigned.
    pub fn assign(&mut self, lit: Literal, reason: Antecedent) {
        let var = lit.variable();
        debug_assert!(self.values[var.index()].is_none());
        self.values[var.index()] = Some(lit.is_positive());
        self.level[var.index()] = self.decision_level();
        self.reason[var.index()] = reason;
        self.trail.push(lit);
    }

    /// Total assignments on the trail.
    #[inline]
    pub fn len(&self) -> usize {
        self.trail.len()
    }

    /// Whether the trail is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    /// Literal at a trail position.
    #[inline]
    pub fn lit_at(&self, index: usize) -> Literal {
        self.trail[index]
    }

    /// The trail as a slice (analysis walks it backwards).
    #[inline]
    pub fn lits(&self) -> &[Literal] {
        &self.trail
    }

    /// Whether the propagation head still trails the assignment tail.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.qhead < self.trail.len()
    }

    /// Advance the propagation head and return the next literal to process.
    #[inline]
    pub fn next_pending(&mut self) -> Literal {
        let lit = self.trail[self.qhead];
        self.qhead += 1;
        lit
    }

    /// Current propagation head.
    #[inline]
    pub fn head(&self) -> usize {
        self.qhead
    }

    /// Pop every assignment above `target` level. The callback sees each
    /// unassigned variable with the polarity it held, in reverse trail
    /// order, so the caller can save phases and repair its order heap.
    pub fn cancel_until(&mut self, target: u32, mut on_unassign: impl FnMut(Variable, bool)) {
        if self.decision_level() <= target {
            return;
        }
        let keep = self.level_start(target + 1);
        for i in (keep..self.trail.len()).rev() {
            let var = self.trail[i].variable();
            let polarity = self.values[var.index()].expect("trail entry unassigned");
            self.values[var.index()] = None;
            self.reason[var.index()] = Antecedent::Decision;
            on_unassign(var, polarity);
        }
        self.trail.truncate(keep);
        self.lim.truncate(target as usize);
        self.qhead = keep.min(self.qhead);
    }

    /// Shared view of the assignment vector (passes use it to skip
    /// assigned variables without borrowing the whole trail).
    #[inline]
    pub fn assignments(&self) -> &[Option<bool>] {
        &self.values
    }

    /// Apply a variable permutation (`perm[old] = new`) to every
    /// variable-indexed table and every stored literal. Clause
    /// antecedents are left alone; the arena does not move here.
    ///
    /// Only legal at decision level 0 with propagation at a fixed point.
    pub fn renumber(&mut self, perm: &[u32]) {
        debug_assert_eq!(self.decision_level(), 0);
        debug_assert!(!self.has_pending());
        let relocate =
            |lit: Literal| Variable(perm[lit.variable().index()]).literal(lit.is_positive());

        let n = self.values.len();
        let mut values = vec![None; n];
        let mut level = vec![0u32; n];
        let mut reason = vec![Antecedent::Decision; n];
        for old in 0..n {
            let new = perm[old] as usize;
            values[new] = self.values[old];
            level[new] = self.level[old];
            reason[new] = match self.reason[old] {
                Antecedent::Binary(other) => Antecedent::Binary(relocate(other)),
                keep => keep,
            };
        }
        self.values = values;
        self.level = level;
        self.reason = reason;
        for lit in &mut self.trail {
            *lit = relocate(*lit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: u32, pos: bool) -> Literal {
        Variable(v).literal(pos)
    }

    #[test]
    fn value_tracks_trail_membership() {
        let mut trail = Trail::default();
        trail.ensure_vars(3);
        assert_eq!(trail.value(lit(0, true)), None);

        trail.assign(lit(0, true), Antecedent::Decision);
        assert!(trail.is_true(lit(0, true)));
        assert!(trail.is_false(lit(0, false)));
        assert_eq!(trail.value(lit(1, true)), None);
    }

    #[test]
    fn cancel_until_restores_undef_and_reports_polarity() {
        let mut trail = Trail::default();
        trail.ensure_vars(4);
        trail.assign(lit(0, true), Antecedent::Decision); // level 0
        trail.new_level();
        trail.assign(lit(1, false), Antecedent::Decision);
        trail.assign(lit(2, true), Antecedent::Binary(lit(1, true)));
        trail.new_level();
        trail.assign(lit(3, true), Antecedent::Decision);

        let mut seen = Vec::new();
        trail.cancel_until(0, |var, polarity| seen.push((var.0, polarity)));

        assert_eq!(seen, vec![(3, true), (2, true), (1, false)]);
        assert_eq!(trail.decision_level(), 0);
        assert_eq!(trail.len(), 1);
        assert!(trail.is_fixed(Variable(0)));
        assert_eq!(trail.value(lit(2, true)), None);
        assert_eq!(trail.reason_of(Variable(2)), Antecedent::Decision);
    }

    #[test]
    fn cancel_to_current_level_is_a_noop() {
        let mut trail = Trail::default();
        trail.ensure_vars(2);
        trail.new_level();
        trail.assign(lit(0, true), Antecedent::Decision);
        trail.cancel_until(1, |_, _| panic!("nothing should be unassigned"));
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn propagation_head_walks_forward_once() {
        let mut trail = Trail::default();
        trail.ensure_vars(2);
        trail.assign(lit(0, true), Antecedent::Decision);
        trail.assign(lit(1, true), Antecedent::Binary(lit(0, false)));

        assert!(trail.has_pending());
        assert_eq!(trail.next_pending(), lit(0, true));
        assert_eq!(trail.next_pending(), lit(1, true));
        assert!(!trail.has_pending());
    }

    #[test]
    fn level_starts_match_separators() {
        let mut trail = Trail::default();
        trail.ensure_vars(4);
        trail.assign(lit(0, true), Antecedent::Decision);
        trail.new_level();
        trail.assign(lit(1, true), Antecedent::Decision);
        trail.assign(lit(2, true), Antecedent::Binary(lit(1, false)));
        trail.new_level();
        trail.assign(lit(3, true), Antecedent::Decision);

        assert_eq!(trail.level_start(0), 0);
        assert_eq!(trail.level_start(1), 1);
        assert_eq!(trail.level_start(2), 3);
        assert_eq!(trail.level_of(Variable(2)), 1);
        assert_eq!(trail.level_of(Variable(3)), 2);
    }
}
