//! Failed-literal probing bookkeeping.
//!
//! Probing assumes a literal at a throwaway decision level and
//! propagates: a conflict means the literal fails, so its negation holds
//! at level 0. The full variant tries every unassigned variable to a
//! fixed point; the in-tree variant only probes roots of the binary
//! implication graph, where one probe covers its whole implication
//! subtree. The propagation loop lives on the solver; candidate
//! selection and the counters live here.

use crate::literal::Literal;

/// Counters for probing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeStats {
    /// Pass invocations.
    pub calls: u64,
    /// Literals probed.
    pub probes: u64,
    /// Failed literals (negation fixed at level 0).
    pub failed: u64,
    /// Rounds that proved the formula UNSAT.
    pub contradictions: u64,
}

/// Prober state.
#[derive(Debug, Default)]
pub struct Prober {
    stats: ProbeStats,
}

impl Prober {
    /// Fresh prober.
    pub fn new() -> Self {
        Prober::default()
    }

    /// Pass counters.
    pub fn stats(&self) -> ProbeStats {
        self.stats
    }

    /// Mutable counters for the solver-side loop.
    pub fn stats_mut(&mut self) -> &mut ProbeStats {
        &mut self.stats
    }

    /// Roots of the binary implication graph: literals that imply
    /// something but are implied by nothing. Probing these first covers
    /// their implication subtrees in one propagation each.
    pub fn intree_roots(&self, num_vars: usize, binaries: &[(Literal, Literal)]) -> Vec<Literal> {
        let num_lits = num_vars * 2;
        let mut out_deg = vec![0u32; num_lits];
        let mut in_deg = vec![0u32; num_lits];
        for &(a, b) in binaries {
            // {a, b} gives ~a -> b and ~b -> a.
            out_deg[a.negated().index()] += 1;
            in_deg[b.index()] += 1;
            out_deg[b.negated().index()] += 1;
            in_deg[a.index()] += 1;
        }
        (0..num_lits)
            .map(Literal::from_index)
            .filter(|l| out_deg[l.index()] > 0 && in_deg[l.index()] == 0)
            .collect()
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
    fn chain_has_two_roots() {
        // {~x0, x1} and {~x1, x2}: x0 -> x1 -> x2 and ~x2 -> ~x1 -> ~x0.
        let prober = Prober::new();
        let roots = prober.intree_roots(
            3,
            &[(lit(0, false), lit(1, true)), (lit(1, false), lit(2, true))],
        );
        assert_eq!(roots, vec![lit(0, true), lit(2, false)]);
    }

    #[test]
    fn cycle_has_no_roots() {
        let prober = Prober::new();
        let roots = prober.intree_roots(
            2,
            &[(lit(0, false), lit(1, true)), (lit(0, true), lit(1, false))],
        );
        assert!(roots.is_empty());
    }
}
