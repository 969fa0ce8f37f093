//! Distillation (vivification) bookkeeping.
//!
//! The pass itself needs the propagator, so it lives on the solver; this
//! module owns candidate selection, the variant switch, and the stats.
//! A clause is shortened by assuming the negation of its literals one at
//! a time at level 0: a conflict cuts the clause to the responsible
//! prefix, a satisfied later literal closes it early, a falsified later
//! literal is redundant and dropped. Visited clauses carry the
//! "distilled" flag so time-boxed calls make progress across epochs.

use crate::arena::{ClauseArena, ClauseRef};

/// Which distillation variant a schedule token selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistillMode {
    /// Full vivification of long clauses: shorten on conflict or
    /// satisfaction, drop falsified literals.
    Clauses,
    /// Only drop literals falsified under the trial assumptions.
    LiteralsOnly,
    /// Vivify binary clauses (each side tested with the clause detached).
    Binaries,
}

/// Counters for distillation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistillStats {
    /// Pass invocations.
    pub calls: u64,
    /// Clauses examined.
    pub checked: u64,
    /// Clauses replaced by a shorter version.
    pub shortened: u64,
    /// Literals removed in total.
    pub lits_removed: u64,
    /// Units discovered (clause collapsed to one literal).
    pub units: u64,
    /// Binary clauses dropped as redundant.
    pub binaries_removed: u64,
}

/// Distiller state: stats only; candidacy lives in the arena flags.
#[derive(Debug, Default)]
pub struct Distiller {
    stats: DistillStats,
}

impl Distiller {
    /// Fresh distiller.
    pub fn new() -> Self {
        Distiller::default()
    }

    /// Pass counters.
    pub fn stats(&self) -> DistillStats {
        self.stats
    }

    /// Mutable counters for the solver-side loop.
    pub fn stats_mut(&mut self) -> &mut DistillStats {
        &mut self.stats
    }

    /// Long clauses not yet visited by distillation, in arena order, up
    /// to `max` of them.
    pub fn candidates(&self, arena: &ClauseArena, max: usize) -> Vec<ClauseRef> {
        arena
            .refs()
            .filter(|&c| !arena.is_distilled(c))
            .take(max)
            .collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Variable;

    #[test]
    fn candidates_skip_marked_clauses() {
        let mut arena = ClauseArena::new();
        let body: Vec<_> = (0..3).map(|v| Variable(v).positive()).collect();
        let a = arena.alloc(&body, false, 1).unwrap();
        let b = arena.alloc(&body, false, 2).unwrap();
        arena.mark_distilled(a);

        let distiller = Distiller::new();
        assert_eq!(distiller.candidates(&arena, 10), vec![b]);
        assert_eq!(distiller.candidates(&arena, 0), Vec::<ClauseRef>::new());
    }
}
