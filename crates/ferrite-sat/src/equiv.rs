//! Equivalent-literal detection and replacement planning.
//!
//! Every binary clause `{a, b}` contributes the implications `¬a → b`
//! and `¬b → a`. A strongly connected component of that graph is a set
//! of mutually implied, hence equivalent, literals; the lowest-encoded
//! member becomes the class representative and every other member is
//! rewritten to it. A component containing both a literal and its
//! negation proves the formula unsatisfiable.
//!
//! This module finds the classes and owns the persistent
//! replaced-literal → representative table; applying the rewrite to the
//! clause database is the solver's job (it owns the storage).

use crate::literal::Literal;

/// Counters for equivalence replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquivStats {
    /// SCC rounds executed.
    pub rounds: u64,
    /// Non-trivial classes found across all rounds.
    pub classes: u64,
    /// Variables rewritten to a representative.
    pub vars_replaced: u64,
    /// Rounds that proved the formula UNSAT.
    pub contradictions: u64,
}

/// Result of one SCC round.
#[derive(Debug, Clone)]
pub struct EquivClasses {
    /// A literal and its negation fell into one class.
    pub unsat: bool,
    /// Canonical image for every literal index; identity outside classes.
    pub lit_map: Vec<Literal>,
    /// `(replaced positive literal, image)` for every replaced variable.
    pub replaced: Vec<(Literal, Literal)>,
}

impl EquivClasses {
    /// Whether the round found anything to rewrite.
    pub fn is_trivial(&self) -> bool {
        !self.unsat && self.replaced.is_empty()
    }
}

/// SCC driver plus the persistent replacement table.
#[derive(Debug, Default)]
pub struct EqReplacer {
    repr: Vec<Literal>,
    stats: EquivStats,
}

impl EqReplacer {
    /// Fresh replacer.
    pub fn new() -> Self {
        EqReplacer::default()
    }

    /// Grow the replacement table to cover `num_vars` variables.
    pub fn ensure_vars(&mut self, num_vars: usize) {
        let want = num_vars * 2;
        while self.repr.len() < want {
            self.repr.push(Literal::from_index(self.repr.len()));
        }
    }

    /// Current image of a literal under all committed replacements.
    #[inline]
    pub fn image(&self, lit: Literal) -> Literal {
        self.repr[lit.index()]
    }

    /// Whether the variable of `lit` has been replaced.
    #[inline]
    pub fn is_replaced(&self, lit: Literal) -> bool {
        self.repr[lit.index()] != lit
    }

    /// Replacement statistics.
    pub fn stats(&self) -> EquivStats {
        self.stats
    }

    /// Run one SCC round over the given implications.
    ///
    /// `binaries` lists each binary clause once; satisfied or removed
    /// binaries must already be filtered out by the caller.
    pub fn find_classes(
        &mut self,
        num_vars: usize,
        binaries: &[(Literal, Literal)],
    ) -> EquivClasses {
        self.stats.rounds += 1;
        let num_lits = num_vars * 2;

        let mut graph: Vec<Vec<u32>> = vec![Vec::new(); num_lits];
        for &(a, b) in binaries {
            graph[a.negated().index()].push(b.0);
            graph[b.negated().index()].push(a.0);
        }

        let sccs = tarjan(&graph);

        let mut lit_map: Vec<Literal> = (0..num_lits).map(Literal::from_index).collect();
        let mut replaced = Vec::new();
        let mut unsat = false;

        for component in &sccs {
            if component.len() < 2 {
                continue;
            }
            // The mirror component (all negations) shows up separately;
            // the first of the pair to be processed maps both.
            if component
                .iter()
                .any(|&l| lit_map[l as usize] != Literal(l))
            {
                continue;
            }
            let rep = Literal(*component.iter().min().expect("non-empty component"));
            if component.contains(&rep.negated().0) {
                unsat = true;
                self.stats.contradictions += 1;
                break;
            }
            self.stats.classes += 1;
            for &raw in component {
                let lit = Literal(raw);
                if lit == rep {
                    continue;
                }
                lit_map[lit.index()] = rep;
                lit_map[lit.negated().index()] = rep.negated();
                let positive = lit.variable().positive();
                replaced.push((positive, lit_map[positive.index()]));
                self.stats.vars_replaced += 1;
            }
        }

        EquivClasses {
            unsat,
            lit_map,
            replaced,
        }
    }

    /// Fold a successfully applied round into the persistent table.
    pub fn commit(&mut self, classes: &EquivClasses) {
        for entry in &mut self.repr {
            *entry = classes.lit_map[entry.index()];
        }
    }

    /// Apply a variable permutation to the table (renumbering). `perm`
    /// maps old variable indices to new ones.
    pub fn permute(&mut self, perm: &[u32]) {
        let relocate = |lit: Literal| -> Literal {
            let var = perm[lit.variable().index()];
            crate::literal::Variable(var).literal(lit.is_positive())
        };
        let mut fresh: Vec<Literal> = (0..self.repr.len()).map(Literal::from_index).collect();
        for (idx, &target) in self.repr.iter().enumerate() {
            let from = relocate(Literal::from_index(idx));
            fresh[from.index()] = relocate(target);
        }
        self.repr = fresh;
    }
}

/// Iterative Tarjan SCC over an adjacency list of literal nodes.
fn tarjan(graph: &[Vec<u32>]) -> Vec<Vec<u32>> {
    const UNSEEN: u32 = u32::MAX;
    let n = graph.len();
    let mut index = vec![UNSEEN; n];
    let mut lowlink = vec![0u32; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<u32> = Vec::new();
    let mut next_index = 0u32;
    let mut sccs = Vec::new();
    // DFS frames: (node, next edge position).
    let mut frames: Vec<(u32, usize)> = Vec::new();

    for root in 0..n as u32 {
        if index[root as usize] != UNSEEN {
            continue;
        }
        frames.push((root, 0));
        while let Some((node, edge)) = frames.last().copied() {
            let node_idx = node as usize;
            if edge == 0 {
                index[node_idx] = next_index;
                lowlink[node_idx] = next_index;
                next_index += 1;
                stack.push(node);
                on_stack[node_idx] = true;
            }
            if edge < graph[node_idx].len() {
                frames.last_mut().expect("frame present").1 += 1;
                let succ = graph[node_idx][edge];
                let succ_idx = succ as usize;
                if index[succ_idx] == UNSEEN {
                    frames.push((succ, 0));
                } else if on_stack[succ_idx] {
                    lowlink[node_idx] = lowlink[node_idx].min(index[succ_idx]);
                }
            } else {
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    lowlink[parent as usize] = lowlink[parent as usize].min(lowlink[node_idx]);
                }
                if lowlink[node_idx] == index[node_idx] {
                    let mut component = Vec::new();
                    loop {
                        let popped = stack.pop().expect("tarjan stack underflow");
                        on_stack[popped as usize] = false;
                        component.push(popped);
                        if popped == node {
                            break;
                        }
                    }
                    sccs.push(component);
                }
            }
        }
    }
    sccs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Variable;

    fn lit(v: u32, pos: bool) -> Literal {
        Variable(v).literal(pos)
    }

    #[test]
    fn mutual_implication_forms_a_class() {
        // {~x0, x1} and {x0, ~x1} make x0 and x1 equivalent.
        let mut eq = EqReplacer::new();
        eq.ensure_vars(2);
        let classes = eq.find_classes(
            2,
            &[(lit(0, false), lit(1, true)), (lit(0, true), lit(1, false))],
        );
        assert!(!classes.unsat);
        assert_eq!(classes.replaced, vec![(lit(1, true), lit(0, true))]);
        assert_eq!(classes.lit_map[lit(1, true).index()], lit(0, true));
        assert_eq!(classes.lit_map[lit(1, false).index()], lit(0, false));
    }

    #[test]
    fn opposite_polarity_cycle_is_detected() {
        // {~x0, x1} and {x0, x1} force x1; adding the mirrored pair forces
        // x0 ↔ ~x1 ↔ contradiction with x0 ↔ x1.
        let mut eq = EqReplacer::new();
        eq.ensure_vars(2);
        let classes = eq.find_classes(
            2,
            &[
                (lit(0, false), lit(1, true)),
                (lit(0, true), lit(1, false)),
                (lit(0, false), lit(1, false)),
                (lit(0, true), lit(1, true)),
            ],
        );
        assert!(classes.unsat);
    }

    #[test]
    fn no_binaries_means_trivial_outcome() {
        let mut eq = EqReplacer::new();
        eq.ensure_vars(3);
        let classes = eq.find_classes(3, &[]);
        assert!(classes.is_trivial());
    }

    #[test]
    fn second_round_after_commit_is_idempotent() {
        let mut eq = EqReplacer::new();
        eq.ensure_vars(3);
        let first = eq.find_classes(
            3,
            &[(lit(1, false), lit(2, true)), (lit(1, true), lit(2, false))],
        );
        assert!(!first.is_trivial());
        eq.commit(&first);
        assert_eq!(eq.image(lit(2, true)), lit(1, true));
        assert_eq!(eq.image(lit(2, false)), lit(1, false));

        // After the rewrite, the binaries collapse to tautologies and are
        // gone; a second round over the remaining (empty) set changes
        // nothing.
        let second = eq.find_classes(3, &[]);
        assert!(second.is_trivial());
    }

    #[test]
    fn chains_pick_the_lowest_literal() {
        // x0 ↔ x1 ↔ x2: everything maps onto x0.
        let bins = [
            (lit(0, false), lit(1, true)),
            (lit(1, false), lit(2, true)),
            (lit(2, false), lit(0, true)),
        ];
        let mut eq = EqReplacer::new();
        eq.ensure_vars(3);
        let classes = eq.find_classes(3, &bins);
        assert!(!classes.unsat);
        assert_eq!(classes.lit_map[lit(1, true).index()], lit(0, true));
        assert_eq!(classes.lit_map[lit(2, true).index()], lit(0, true));
        assert_eq!(classes.replaced.len(), 2);
    }

    #[test]
    fn permute_relocates_the_table() {
        let mut eq = EqReplacer::new();
        eq.ensure_vars(3);
        let classes = eq.find_classes(
            3,
            &[(lit(0, false), lit(2, true)), (lit(0, true), lit(2, false))],
        );
        eq.commit(&classes);
        assert_eq!(eq.image(lit(2, true)), lit(0, true));

        // Swap variables 0 and 1; the x2 → x0 entry must follow.
        eq.permute(&[1, 0, 2]);
        assert_eq!(eq.image(lit(2, true)), lit(1, true));
        assert_eq!(eq.image(lit(1, true)), lit(1, true));
    }
}
