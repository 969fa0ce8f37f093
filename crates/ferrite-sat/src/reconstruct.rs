//! Extending a model of the reduced formula to the original formula.
//!
//! Variable elimination and equivalence replacement are equisatisfiable,
//! not model-preserving: a satisfying assignment of the reduced formula
//! says nothing about eliminated or replaced variables. Each such
//! transformation pushes a step here, in **outer** numbering (so internal
//! renumbering never invalidates the stack), and reconstruction replays
//! the steps in reverse.
//!
//! The stack is the solver's only persistent solution state; it derives
//! serde so callers can park it between processes via
//! `solution_state` / `restore_solution_state`.

use serde::{Deserialize, Serialize};

use crate::literal::{Literal, Variable};

/// One recorded transformation, in application order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReconstructionStep {
    /// `var` was eliminated by resolution; `clauses` are the original
    /// clauses containing it (either polarity), exactly as removed.
    Eliminated {
        /// The eliminated variable (outer numbering).
        var: Variable,
        /// The removed clauses, each containing `var`.
        clauses: Vec<Vec<Literal>>,
    },
    /// Literals were replaced by class representatives; each pair maps a
    /// replaced literal to the representative it now stands for.
    Equivalence {
        /// `(replaced, representative)` pairs in outer numbering.
        pairs: Vec<(Literal, Literal)>,
    },
}

/// Append-only record of equisatisfiable transformations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconstructionStack {
    steps: Vec<ReconstructionStep>,
}

impl ReconstructionStack {
    /// Empty stack.
    pub fn new() -> Self {
        ReconstructionStack::default()
    }

    /// Whether any transformation was recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Record a variable elimination.
    pub fn push_eliminated(&mut self, var: Variable, clauses: Vec<Vec<Literal>>) {
        self.steps.push(ReconstructionStep::Eliminated { var, clauses });
    }

    /// Record an equivalence replacement round.
    pub fn push_equivalence(&mut self, pairs: Vec<(Literal, Literal)>) {
        if !pairs.is_empty() {
            self.steps.push(ReconstructionStep::Equivalence { pairs });
        }
    }

    /// Extend `model` (indexed by outer variable, defaulting false) into
    /// a model of the original formula by replaying steps in reverse.
    pub fn reconstruct(&self, model: &mut Vec<bool>) {
        for step in self.steps.iter().rev() {
            match step {
                ReconstructionStep::Equivalence { pairs } => {
                    for &(replaced, rep) in pairs.iter().rev() {
                        let need = rep.variable().index().max(replaced.variable().index());
                        if need >= model.len() {
                            model.resize(need + 1, false);
                        }
                        let rep_true = model[rep.variable().index()] == rep.is_positive();
                        model[replaced.variable().index()] =
                            rep_true == replaced.is_positive();
                    }
                }
                ReconstructionStep::Eliminated { var, clauses } => {
                    if var.index() >= model.len() {
                        model.resize(var.index() + 1, false);
                    }
                    for clause in clauses {
                        let satisfied = clause
                            .iter()
                            .any(|l| model[l.variable().index()] == l.is_positive());
                        if !satisfied {
                            // Only the pivot can rescue the clause: every
                            // other literal is false under the model.
                            let pivot = clause
                                .iter()
                                .find(|l| l.variable() == *var)
                                .expect("eliminated clause without its pivot");
                            model[var.index()] = pivot.is_positive();
                        }
                    }
                }
            }
        }
    }

    /// Drop every recorded step.
    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: u32, pos: bool) -> Literal {
        Variable(v).literal(pos)
    }

    #[test]
    fn eliminated_variable_is_flipped_to_satisfy() {
        // x0 eliminated from {x0, x1} and {~x0, x2}; model has x1=F, x2=T,
        // so x0 must become true.
        let mut stack = ReconstructionStack::new();
        stack.push_eliminated(
            Variable(0),
            vec![vec![lit(0, true), lit(1, true)], vec![lit(0, false), lit(2, true)]],
        );

        let mut model = vec![false, false, true];
        stack.reconstruct(&mut model);
        assert!(model[0]);

        // Both clauses hold.
        assert!(model[0] || model[1]);
        assert!(!model[0] || model[2]);
    }

    #[test]
    fn equivalence_pairs_copy_the_representative() {
        // x1 was replaced by ~x0: their values must mirror each other.
        let mut stack = ReconstructionStack::new();
        stack.push_equivalence(vec![(lit(1, true), lit(0, false))]);

        let mut model = vec![true, true];
        stack.reconstruct(&mut model);
        assert!(!model[1]);

        let mut model = vec![false, false];
        stack.reconstruct(&mut model);
        assert!(model[1]);
    }

    #[test]
    fn steps_replay_in_reverse_order() {
        // First x1 := x0, later x0 eliminated from {x0, x2}. Reconstruction
        // must fix x0 before deriving x1 from it.
        let mut stack = ReconstructionStack::new();
        stack.push_equivalence(vec![(lit(1, true), lit(0, true))]);
        stack.push_eliminated(Variable(0), vec![vec![lit(0, true), lit(2, true)]]);

        let mut model = vec![false, false, false];
        stack.reconstruct(&mut model);
        assert!(model[0], "pivot flipped to satisfy {{x0, x2}}");
        assert!(model[1], "equivalence replayed after elimination");
    }

    #[test]
    fn empty_equivalence_rounds_are_not_recorded() {
        let mut stack = ReconstructionStack::new();
        stack.push_equivalence(Vec::new());
        assert!(stack.is_empty());
        stack.push_equivalence(vec![(lit(2, true), lit(1, false))]);
        assert_eq!(stack.len(), 1);
    }
}
