//! Conflict-analysis workspace.
//!
//! First-UIP resolution itself lives in the solver (it walks the trail
//! and the clause database); this module owns the reusable state: seen
//! marks, the learned-clause buffer, glue computation, and the caches
//! and adaptive budgets of the two minimization passes.
//!
//! Both minimizations police their own cost. Recursive minimization
//! disables itself for the rest of the run once its cost per percent of
//! removed literals exceeds a threshold; binary-reachability
//! minimization triples its budget while it earns its keep and shuts off
//! when it stops.

use crate::literal::{Literal, Variable};
use crate::trail::Trail;

/// Disable recursive minimization when (cost / 1000) per percent of
/// literals removed exceeds this.
const RECURSIVE_KILO_COST_PER_PERCENT: u64 = 200_000;
/// Cost accumulated before the recursive budget is judged at all.
const RECURSIVE_JUDGE_AFTER: u64 = 10_000_000;

/// Base step budget of the binary-reachability minimization.
const BINARY_BASE_BUDGET: u64 = 400;
/// Conflicts between budget adjustments.
const BINARY_ADJUST_EVERY: u64 = 1024;
/// Gain above this percentage triples the budget.
const BINARY_BOOST_GAIN: f64 = 7.0;
/// Gain below this percentage disables the pass.
const BINARY_DISABLE_GAIN: f64 = 1.0;

/// Reusable state for first-UIP learning and clause minimization.
#[derive(Debug, Default)]
pub struct ConflictAnalyzer {
    seen: Vec<bool>,
    seen_to_clear: Vec<usize>,
    learned: Vec<Literal>,
    uip: Option<Literal>,
    glue_seen: Vec<bool>,
    glue_to_clear: Vec<usize>,

    // Caches for recursive minimization, cleared per conflict.
    pub(crate) removable: Vec<bool>,
    pub(crate) poison: Vec<bool>,
    pub(crate) visited: Vec<bool>,
    pub(crate) min_to_clear: Vec<usize>,

    recursive_enabled: bool,
    recursive_cost: u64,
    lits_before: u64,
    lits_removed: u64,

    binary_factor: u64,
    binary_before: u64,
    binary_removed: u64,
    binary_last_adjust: u64,
}

impl ConflictAnalyzer {
    /// Fresh analyzer.
    pub fn new() -> Self {
        ConflictAnalyzer {
            recursive_enabled: true,
            binary_factor: 1,
            ..ConflictAnalyzer::default()
        }
    }

    /// Grow to cover `num_vars` variables.
    pub fn ensure_vars(&mut self, num_vars: usize) {
        if self.seen.len() < num_vars {
            self.seen.resize(num_vars, false);
            self.removable.resize(num_vars, false);
            self.poison.resize(num_vars, false);
            self.visited.resize(num_vars, false);
        }
    }

    /// Reset per-conflict state.
    pub fn start(&mut self) {
        for idx in self.seen_to_clear.drain(..) {
            self.seen[idx] = false;
        }
        self.learned.clear();
        self.uip = None;
    }

    /// Mark a variable as resolved into the conflict.
    #[inline]
    pub fn mark_seen(&mut self, var: Variable) {
        if !self.seen[var.index()] {
            self.seen[var.index()] = true;
            self.seen_to_clear.push(var.index());
        }
    }

    /// Drop the mark of a variable (when resolving on it).
    #[inline]
    pub fn unmark_seen(&mut self, var: Variable) {
        self.seen[var.index()] = false;
    }

    /// Whether the variable was resolved into the conflict.
    #[inline]
    pub fn is_seen(&self, var: Variable) -> bool {
        self.seen[var.index()]
    }

    /// Append an out-of-level literal to the learned clause.
    #[inline]
    pub fn add_learned(&mut self, lit: Literal) {
        self.learned.push(lit);
    }

    /// Record the asserting literal (the first UIP, negated).
    #[inline]
    pub fn set_uip(&mut self, lit: Literal) {
        self.uip = Some(lit);
    }

    /// The asserting literal.
    #[inline]
    pub fn uip(&self) -> Literal {
        self.uip.expect("conflict analysis has not reached the UIP")
    }

    /// The learned literals besides the UIP.
    #[inline]
    pub fn learned(&self) -> &[Literal] {
        &self.learned
    }

    /// Take the learned buffer for minimization.
    #[inline]
    pub fn take_learned(&mut self) -> Vec<Literal> {
        std::mem::take(&mut self.learned)
    }

    /// Put the (minimized) buffer back.
    #[inline]
    pub fn set_learned(&mut self, learned: Vec<Literal>) {
        self.learned = learned;
    }

    /// Backjump level: the highest level among non-UIP literals, 0 for a
    /// unit learned clause.
    pub fn backjump_level(&self, trail: &Trail) -> u32 {
        self.learned
            .iter()
            .map(|l| trail.level_of(l.variable()))
            .max()
            .unwrap_or(0)
    }

    /// Glue of the learned clause: distinct decision levels among its
    /// literals, the UIP included.
    pub fn compute_glue(&mut self, trail: &Trail) -> u32 {
        let top = trail.decision_level() as usize + 1;
        if self.glue_seen.len() < top {
            self.glue_seen.resize(top, false);
        }
        let mut glue = 0;
        for lit in self.uip.iter().chain(self.learned.iter()) {
            let level = trail.level_of(lit.variable()) as usize;
            if !self.glue_seen[level] {
                self.glue_seen[level] = true;
                self.glue_to_clear.push(level);
                glue += 1;
            }
        }
        for level in self.glue_to_clear.drain(..) {
            self.glue_seen[level] = false;
        }
        glue
    }

    /// Assemble the learned clause, UIP first.
    pub fn build_clause(&self) -> Vec<Literal> {
        let mut clause = Vec::with_capacity(self.learned.len() + 1);
        clause.push(self.uip());
        clause.extend_from_slice(&self.learned);
        clause
    }

    /// Whether recursive minimization is still enabled.
    #[inline]
    pub fn recursive_minimize_enabled(&self) -> bool {
        self.recursive_enabled
    }

    /// Account one recursive-minimization run and re-judge the budget.
    pub fn note_recursive_cost(&mut self, steps: u64, before: usize, removed: usize) {
        self.recursive_cost += steps;
        self.lits_before += before as u64;
        self.lits_removed += removed as u64;
        if self.recursive_enabled
            && self.recursive_cost >= RECURSIVE_JUDGE_AFTER
            && self.lits_before > 0
        {
            let percent = 100.0 * self.lits_removed as f64 / self.lits_before as f64;
            let kilo_cost = self.recursive_cost / 1000;
            if percent <= 0.0
                || kilo_cost as f64 / percent > RECURSIVE_KILO_COST_PER_PERCENT as f64
            {
                self.recursive_enabled = false;
            }
        }
    }

    /// Step budget for binary-reachability minimization, `None` when the
    /// pass has disabled itself.
    pub fn binary_minimize_budget(&self) -> Option<u64> {
        match self.binary_factor {
            0 => None,
            f => Some(BINARY_BASE_BUDGET * f),
        }
    }

    /// Account one binary-minimization run; every so often the factor is
    /// re-derived from the observed gain.
    pub fn note_binary_gain(&mut self, conflicts: u64, before: usize, removed: usize) {
        self.binary_before += before as u64;
        self.binary_removed += removed as u64;
        if self.binary_factor != 0
            && conflicts >= self.binary_last_adjust + BINARY_ADJUST_EVERY
            && self.binary_before > 0
        {
            let gain = 100.0 * self.binary_removed as f64 / self.binary_before as f64;
            self.binary_factor = if gain > BINARY_BOOST_GAIN {
                3
            } else if gain < BINARY_DISABLE_GAIN {
                0
            } else {
                1
            };
            self.binary_last_adjust = conflicts;
            self.binary_before = 0;
            self.binary_removed = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::Antecedent;

    fn lit(v: u32, pos: bool) -> Literal {
        Variable(v).literal(pos)
    }

    fn trail_with_levels() -> Trail {
        // x0 at level 1, x1 and x2 at level 2, x3 at level 3.
        let mut trail = Trail::default();
        trail.ensure_vars(4);
        trail.new_level();
        trail.assign(lit(0, true), Antecedent::Decision);
        trail.new_level();
        trail.assign(lit(1, true), Antecedent::Decision);
        trail.assign(lit(2, true), Antecedent::Binary(lit(1, false)));
        trail.new_level();
        trail.assign(lit(3, true), Antecedent::Decision);
        trail
    }

    #[test]
    fn backjump_is_highest_non_uip_level() {
        let trail = trail_with_levels();
        let mut analyzer = ConflictAnalyzer::new();
        analyzer.ensure_vars(4);
        analyzer.start();
        analyzer.set_uip(lit(3, false));
        analyzer.add_learned(lit(0, false));
        analyzer.add_learned(lit(2, false));
        assert_eq!(analyzer.backjump_level(&trail), 2);
    }

    #[test]
    fn unit_learned_clause_backjumps_to_zero() {
        let trail = trail_with_levels();
        let mut analyzer = ConflictAnalyzer::new();
        analyzer.ensure_vars(4);
        analyzer.start();
        analyzer.set_uip(lit(3, false));
        assert_eq!(analyzer.backjump_level(&trail), 0);
    }

    #[test]
    fn glue_counts_distinct_levels() {
        let trail = trail_with_levels();
        let mut analyzer = ConflictAnalyzer::new();
        analyzer.ensure_vars(4);
        analyzer.start();
        analyzer.set_uip(lit(3, false)); // level 3
        analyzer.add_learned(lit(1, false)); // level 2
        analyzer.add_learned(lit(2, false)); // level 2
        analyzer.add_learned(lit(0, false)); // level 1
        assert_eq!(analyzer.compute_glue(&trail), 3);
        // The workspace resets between calls.
        assert_eq!(analyzer.compute_glue(&trail), 3);
    }

    #[test]
    fn uip_leads_the_built_clause() {
        let mut analyzer = ConflictAnalyzer::new();
        analyzer.ensure_vars(4);
        analyzer.start();
        analyzer.set_uip(lit(2, false));
        analyzer.add_learned(lit(0, true));
        assert_eq!(analyzer.build_clause(), vec![lit(2, false), lit(0, true)]);
    }

    #[test]
    fn expensive_useless_minimization_disables_itself() {
        let mut analyzer = ConflictAnalyzer::new();
        assert!(analyzer.recursive_minimize_enabled());
        // Huge cost, nothing removed.
        analyzer.note_recursive_cost(RECURSIVE_JUDGE_AFTER, 1000, 0);
        assert!(!analyzer.recursive_minimize_enabled());
        // And it never comes back in-run.
        analyzer.note_recursive_cost(1, 10, 10);
        assert!(!analyzer.recursive_minimize_enabled());
    }

    #[test]
    fn binary_budget_adapts_to_gain() {
        let mut analyzer = ConflictAnalyzer::new();
        let base = analyzer.binary_minimize_budget().unwrap();

        // Strong gain triples the budget.
        analyzer.note_binary_gain(BINARY_ADJUST_EVERY, 100, 20);
        assert_eq!(analyzer.binary_minimize_budget(), Some(base * 3));

        // Negligible gain disables the pass.
        analyzer.note_binary_gain(2 * BINARY_ADJUST_EVERY, 1000, 1);
        assert_eq!(analyzer.binary_minimize_budget(), None);
    }
}
