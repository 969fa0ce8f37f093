//! Occurrence-list simplification: bounded variable elimination plus the
//! subsumption and self-subsumption sub-passes that run over the same
//! occurrence lists.
//!
//! The pass works on a private copy of the clause database: long clauses
//! come in from the arena, binaries from the watch lists, and resolvents
//! created during the pass join them. Nothing touches the solver's
//! storage until the pass is over; the outcome is a plan (deletions,
//! additions, units, eliminated variables with their clause sets) the
//! solver applies under its own invariants. The propagator is detached
//! for the duration.
//!
//! Elimination follows the classic resolution rule: a variable `v` can
//! go when every resolvent of its positive against its negative
//! occurrences, tautologies dropped, fits within the clause count it
//! frees (plus a configured slack) and no resolvent blows past a length
//! bound. Candidates are tried cheapest first, by the product of the two
//! occurrence counts.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::arena::ClauseRef;
use crate::literal::{Literal, Variable};
use crate::subsume::{is_subset, signature, signature_subset, strengthening_literal};

/// Occurrence cap: variables seen more often than this on either side
/// are never elimination candidates.
const MAX_OCCURRENCES: usize = 16;

/// Where a pass-local clause came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// A long clause in the arena.
    Long(ClauseRef),
    /// A binary held in the watch lists as `{a, b}`.
    Binary(Literal, Literal),
    /// Created during this pass (resolvent or strengthened copy).
    Fresh,
}

#[derive(Debug)]
struct PassClause {
    lits: Vec<Literal>,
    sig: u64,
    origin: Origin,
    redundant: bool,
    deleted: bool,
}

/// Counters for the occurrence pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElimStats {
    /// Variables eliminated by resolution (pure literals included).
    pub vars_eliminated: u64,
    /// Clauses removed with their pivot.
    pub clauses_removed: u64,
    /// Non-tautological resolvents produced.
    pub resolvents_added: u64,
    /// Tautological resolvents dropped.
    pub tautologies: u64,
    /// Clauses deleted by subsumption.
    pub subsumed: u64,
    /// Literals removed by self-subsuming resolution.
    pub strengthened_lits: u64,
}

/// The plan an occurrence pass hands back to the solver.
#[derive(Debug, Default)]
pub struct ElimOutcome {
    /// An empty resolvent or empty strengthened clause appeared.
    pub unsat: bool,
    /// Long clauses to free (proof delete included).
    pub deleted_long: Vec<ClauseRef>,
    /// Binary clauses to drop from the watch lists.
    pub deleted_binary: Vec<(Literal, Literal)>,
    /// Clauses to add, with their redundancy flag.
    pub added: Vec<(Vec<Literal>, bool)>,
    /// Long clauses to promote from redundant to irredundant.
    pub promoted_long: Vec<ClauseRef>,
    /// Binary clauses to promote from redundant to irredundant.
    pub promoted_binary: Vec<(Literal, Literal)>,
    /// Unit clauses derived by the pass.
    pub units: Vec<Literal>,
    /// Eliminated variables with the clauses removed for each, pivot
    /// included, for the reconstruction stack.
    pub eliminated: Vec<(Variable, Vec<Vec<Literal>>)>,
}

/// Occurrence-list simplification pass state.
#[derive(Debug)]
pub struct OccurSimp {
    num_vars: usize,
    clauses: Vec<PassClause>,
    occ: Vec<Vec<usize>>,
    /// Variables allowed as elimination pivots (unassigned, unfrozen,
    /// not already removed, not sampling-weighted).
    eliminable: Vec<bool>,
    marks: Vec<i8>,
    resolvent: Vec<Literal>,
    outcome: ElimOutcome,
    stats: ElimStats,
}

impl OccurSimp {
    /// Start a pass over `num_vars` variables. `eliminable[v]` gates
    /// which variables may be chosen as pivots.
    pub fn new(num_vars: usize, eliminable: Vec<bool>) -> Self {
        debug_assert_eq!(eliminable.len(), num_vars);
        OccurSimp {
            num_vars,
            clauses: Vec::new(),
            occ: vec![Vec::new(); num_vars * 2],
            eliminable,
            marks: vec![0; num_vars],
            resolvent: Vec::new(),
            outcome: ElimOutcome::default(),
            stats: ElimStats::default(),
        }
    }

    /// Pass counters.
    pub fn stats(&self) -> ElimStats {
        self.stats
    }

    /// Feed a long clause from the arena.
    pub fn add_long(&mut self, cref: ClauseRef, lits: &[Literal], redundant: bool) {
        self.push_clause(lits.to_vec(), Origin::Long(cref), redundant);
    }

    /// Feed a binary clause from the watch lists.
    pub fn add_binary(&mut self, a: Literal, b: Literal, redundant: bool) {
        self.push_clause(vec![a, b], Origin::Binary(a, b), redundant);
    }

    fn push_clause(&mut self, lits: Vec<Literal>, origin: Origin, redundant: bool) {
        let idx = self.clauses.len();
        for &lit in &lits {
            self.occ[lit.index()].push(idx);
        }
        self.clauses.push(PassClause {
            sig: signature(&lits),
            lits,
            origin,
            redundant,
            deleted: false,
        });
    }

    fn occ_count(&self, lit: Literal) -> usize {
        self.occ[lit.index()]
            .iter()
            .filter(|&&i| !self.clauses[i].deleted)
            .count()
    }

    fn live_occs(&self, lit: Literal) -> Vec<usize> {
        self.occ[lit.index()]
            .iter()
            .copied()
            .filter(|&i| !self.clauses[i].deleted)
            .collect()
    }

    /// Mark a clause deleted, logging the deletion if it exists outside
    /// the pass.
    fn delete_clause(&mut self, idx: usize) {
        let clause = &mut self.clauses[idx];
        if clause.deleted {
            return;
        }
        clause.deleted = true;
        match clause.origin {
            Origin::Long(cref) => self.outcome.deleted_long.push(cref),
            Origin::Binary(a, b) => self.outcome.deleted_binary.push((a, b)),
            Origin::Fresh => {}
        }
    }

    /// Backward subsumption and self-subsuming resolution over the
    /// occurrence lists. Each clause tries to subsume or strengthen the
    /// clauses sharing its rarest literal. Costs are counted in subset
    /// checks against `budget`.
    pub fn subsume_round(&mut self, mut budget: u64) {
        for idx in 0..self.clauses.len() {
            if budget == 0 || self.outcome.unsat {
                return;
            }
            if self.clauses[idx].deleted {
                continue;
            }

            // Subsumption: scan the occurrence list of the least frequent
            // literal; any superset found there dies.
            let min_lit = match self.clauses[idx]
                .lits
                .iter()
                .copied()
                .min_by_key(|&l| self.occ[l.index()].len())
            {
                Some(l) => l,
                None => continue,
            };
            for other in self.live_occs(min_lit) {
                if other == idx || self.clauses[other].deleted {
                    continue;
                }
                budget = budget.saturating_sub(1);
                if !signature_subset(self.clauses[idx].sig, self.clauses[other].sig) {
                    continue;
                }
                if is_subset(&self.clauses[idx].lits, &self.clauses[other].lits) {
                    // An irredundant clause must stay represented: promote
                    // the subsuming clause if needed.
                    if !self.clauses[other].redundant && self.clauses[idx].redundant {
                        self.clauses[idx].redundant = false;
                        match self.clauses[idx].origin {
                            Origin::Long(cref) => self.outcome.promoted_long.push(cref),
                            Origin::Binary(a, b) => {
                                self.outcome.promoted_binary.push((a, b));
                            }
                            Origin::Fresh => {}
                        }
                    }
                    self.delete_clause(other);
                    self.stats.subsumed += 1;
                }
                if budget == 0 {
                    return;
                }
            }

            // Self-subsumption: for each literal, look for clauses that
            // contain it negated and otherwise a superset.
            for li in 0..self.clauses[idx].lits.len() {
                let lit = self.clauses[idx].lits[li];
                for other in self.live_occs(lit.negated()) {
                    if other == idx || self.clauses[other].deleted {
                        continue;
                    }
                    budget = budget.saturating_sub(1);
                    if !signature_subset(self.clauses[idx].sig, self.clauses[other].sig) {
                        continue;
                    }
                    let strengthened = strengthening_literal(
                        &self.clauses[idx].lits,
                        &self.clauses[other].lits,
                    );
                    if strengthened == Some(lit.negated()) {
                        self.strengthen(other, lit.negated());
                        if self.outcome.unsat {
                            return;
                        }
                    }
                    if budget == 0 {
                        return;
                    }
                }
            }
        }
    }

    /// Remove one literal from a clause: the original leaves the solver,
    /// the shortened copy continues as a fresh pass clause.
    fn strengthen(&mut self, idx: usize, remove: Literal) {
        let mut lits = self.clauses[idx].lits.clone();
        let redundant = self.clauses[idx].redundant;
        lits.retain(|&l| l != remove);
        self.delete_clause(idx);
        self.stats.strengthened_lits += 1;
        match lits.len() {
            0 => self.outcome.unsat = true,
            1 => self.push_unit(lits[0]),
            _ => self.push_clause(lits, Origin::Fresh, redundant),
        }
    }

    /// Record a derived unit. The variable is constrained by a clause
    /// the pass-local database no longer sees, so it must not be picked
    /// as an elimination pivot afterwards.
    fn push_unit(&mut self, unit: Literal) {
        self.eliminable[unit.variable().index()] = false;
        self.outcome.units.push(unit);
    }

    /// Resolve two clauses on `pivot`; `None` for tautologies.
    fn resolve(&mut self, pos: usize, neg: usize, pivot: Variable) -> Option<Vec<Literal>> {
        self.resolvent.clear();
        for idx in [pos, neg] {
            for &lit in &self.clauses[idx].lits {
                if lit.variable() != pivot {
                    self.marks[lit.variable().index()] = 0;
                }
            }
        }
        for idx in [pos, neg] {
            for &lit in &self.clauses[idx].lits {
                if lit.variable() == pivot {
                    continue;
                }
                let sign: i8 = if lit.is_positive() { 1 } else { -1 };
                let mark = &mut self.marks[lit.variable().index()];
                if *mark == -sign {
                    self.stats.tautologies += 1;
                    return None;
                }
                if *mark == 0 {
                    *mark = sign;
                    self.resolvent.push(lit);
                }
            }
        }
        Some(self.resolvent.clone())
    }

    /// Try to eliminate one variable. Returns whether it was eliminated.
    ///
    /// Only irredundant occurrences drive the resolution criterion and
    /// the reconstruction record; redundant clauses containing the pivot
    /// are implied and simply deleted alongside.
    fn try_eliminate(
        &mut self,
        var: Variable,
        clause_slack: usize,
        max_resolvent: usize,
    ) -> bool {
        let all_pos = self.live_occs(var.positive());
        let all_neg = self.live_occs(var.negative());
        let pos_occs: Vec<usize> = all_pos
            .iter()
            .copied()
            .filter(|&i| !self.clauses[i].redundant)
            .collect();
        let neg_occs: Vec<usize> = all_neg
            .iter()
            .copied()
            .filter(|&i| !self.clauses[i].redundant)
            .collect();
        if pos_occs.len() > MAX_OCCURRENCES || neg_occs.len() > MAX_OCCURRENCES {
            return false;
        }

        let removed_count = pos_occs.len() + neg_occs.len();
        let mut resolvents: Vec<Vec<Literal>> = Vec::new();

        if !pos_occs.is_empty() && !neg_occs.is_empty() {
            for &p in &pos_occs {
                for &n in &neg_occs {
                    match self.resolve(p, n, var) {
                        None => continue,
                        Some(res) if res.is_empty() => {
                            self.outcome.unsat = true;
                            return false;
                        }
                        Some(res) => {
                            if res.len() > max_resolvent {
                                return false;
                            }
                            resolvents.push(res);
                            if resolvents.len() > removed_count + clause_slack {
                                return false;
                            }
                        }
                    }
                }
            }
        }

        // Commit: record the removed irredundant clauses for
        // reconstruction, delete everything mentioning the pivot, add
        // the resolvents.
        let mut removed_bodies = Vec::with_capacity(removed_count);
        for &idx in pos_occs.iter().chain(neg_occs.iter()) {
            removed_bodies.push(self.clauses[idx].lits.clone());
        }
        for &idx in all_pos.iter().chain(all_neg.iter()) {
            self.delete_clause(idx);
        }
        self.stats.clauses_removed += (all_pos.len() + all_neg.len()) as u64;
        self.stats.vars_eliminated += 1;
        self.stats.resolvents_added += resolvents.len() as u64;

        for res in resolvents {
            match res.len() {
                1 => self.push_unit(res[0]),
                _ => self.push_clause(res, Origin::Fresh, false),
            }
        }
        self.outcome.eliminated.push((var, removed_bodies));
        self.eliminable[var.index()] = false;
        true
    }

    /// Run the elimination loop, cheapest candidates first.
    pub fn eliminate_round(
        &mut self,
        clause_slack: usize,
        max_resolvent: usize,
        max_eliminations: usize,
        interrupt: &AtomicBool,
    ) {
        let mut order: Vec<(usize, u32)> = (0..self.num_vars as u32)
            .filter(|&v| self.eliminable[v as usize])
            .map(|v| {
                let var = Variable(v);
                let cost = self.occ_count(var.positive()) * self.occ_count(var.negative());
                (cost, v)
            })
            .collect();
        order.sort_unstable();

        let mut done = 0;
        for (_, v) in order {
            if done >= max_eliminations || self.outcome.unsat {
                break;
            }
            if interrupt.load(Ordering::Relaxed) {
                break;
            }
            if self.try_eliminate(Variable(v), clause_slack, max_resolvent) {
                done += 1;
            }
        }
    }

    /// Close the pass: surviving fresh clauses become additions.
    pub fn finish(mut self) -> ElimOutcome {
        for clause in &self.clauses {
            if !clause.deleted && clause.origin == Origin::Fresh {
                self.outcome
                    .added
                    .push((clause.lits.clone(), clause.redundant));
            }
        }
        self.outcome
    }
}
