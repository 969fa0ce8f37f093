//! Variable activity and decision ordering.
//!
//! Exponential VSIDS: bumping adds a growing increment, decay multiplies
//! the increment instead of touching every score, and scores rescale when
//! they approach overflow. Decisions pop a binary max-heap keyed by
//! activity; the heap is repaired lazily: assigned variables stay in it
//! and are skipped on pop, while unassignment pushes variables back.

use crate::literal::Variable;

const INVALID_POS: u32 = u32::MAX;
const RESCALE_LIMIT: f64 = 1e100;

/// Activity scores plus the decision order heap.
#[derive(Debug)]
pub struct Vsids {
    activity: Vec<f64>,
    increment: f64,
    decay: f64,
    heap: Vec<u32>,
    pos: Vec<u32>,
}

impl Vsids {
    /// Create the heuristic with the given per-conflict decay.
    pub fn new(decay: f64) -> Self {
        Vsids {
            activity: Vec::new(),
            increment: 1.0,
            decay,
            heap: Vec::new(),
            pos: Vec::new(),
        }
    }

    /// Grow to cover `num_vars` variables; new variables enter the heap.
    pub fn ensure_vars(&mut self, num_vars: usize) {
        let old = self.activity.len();
        if old < num_vars {
            self.activity.resize(num_vars, 0.0);
            self.pos.resize(num_vars, INVALID_POS);
            for v in old..num_vars {
                self.push_heap(v as u32);
            }
        }
    }

    /// Current activity of a variable.
    #[inline]
    pub fn activity(&self, var: Variable) -> f64 {
        self.activity[var.index()]
    }

    /// Bump a variable involved in conflict analysis.
    #[inline]
    pub fn bump(&mut self, var: Variable) {
        let idx = var.index();
        self.activity[idx] += self.increment;
        if self.activity[idx] > RESCALE_LIMIT {
            self.rescale();
        }
        if self.pos[idx] != INVALID_POS {
            self.sift_up(self.pos[idx] as usize);
        }
    }

    /// Decay all activities by growing the increment.
    #[inline]
    pub fn decay(&mut self) {
        self.increment /= self.decay;
    }

    fn rescale(&mut self) {
        for a in &mut self.activity {
            *a *= 1.0 / RESCALE_LIMIT;
        }
        self.increment *= 1.0 / RESCALE_LIMIT;
    }

    /// Put an unassigned variable back into the heap.
    #[inline]
    pub fn insert(&mut self, var: Variable) {
        if self.pos[var.index()] == INVALID_POS {
            self.push_heap(var.0);
        }
    }

    /// Pop the highest-activity variable that is still unassigned.
    pub fn pop_unassigned(&mut self, values: &[Option<bool>]) -> Option<Variable> {
        while let Some(top) = self.pop_heap() {
            if values[top as usize].is_none() {
                return Some(Variable(top));
            }
        }
        None
    }

    /// Rebuild the heap from scratch over the given variables, keeping
    /// current activities (used after renumbering).
    pub fn rebuild(&mut self, vars: impl Iterator<Item = Variable>) {
        self.heap.clear();
        self.pos.iter_mut().for_each(|p| *p = INVALID_POS);
        for var in vars {
            self.push_heap(var.0);
        }
    }

    /// Apply a variable permutation: the score of old index `v` moves to
    /// `perm[v]`. The caller rebuilds the heap afterwards.
    pub fn permute(&mut self, perm: &[u32]) {
        let mut fresh = vec![0.0; self.activity.len()];
        for (old, &new) in perm.iter().enumerate() {
            fresh[new as usize] = self.activity[old];
        }
        self.activity = fresh;
    }

    #[inline]
    fn prefer(&self, a: u32, b: u32) -> bool {
        let (aa, ab) = (self.activity[a as usize], self.activity[b as usize]);
        aa > ab || (aa == ab && a < b)
    }

    fn push_heap(&mut self, var: u32) {
        let at = self.heap.len();
        self.heap.push(var);
        self.pos[var as usize] = at as u32;
        self.sift_up(at);
    }

    fn pop_heap(&mut self) -> Option<u32> {
        let top = *self.heap.first()?;
        self.pos[top as usize] = INVALID_POS;
        let last = self.heap.pop().expect("non-empty heap");
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.pos[last as usize] = 0;
            self.sift_down(0);
        }
        Some(top)
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / 2;
            if !self.prefer(self.heap[at], self.heap[parent]) {
                break;
            }
            self.swap(at, parent);
            at = parent;
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        loop {
            let mut best = at;
            for child in [2 * at + 1, 2 * at + 2] {
                if child < self.heap.len() && self.prefer(self.heap[child], self.heap[best]) {
                    best = child;
                }
            }
            if best == at {
                return;
            }
            self.swap(at, best);
            at = best;
        }
    }

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.pos[self.heap[a] as usize] = a as u32;
        self.pos[self.heap[b] as usize] = b as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_highest_activity_first() {
        let mut vsids = Vsids::new(0.95);
        vsids.ensure_vars(4);
        vsids.bump(Variable(2));
        vsids.bump(Variable(2));
        vsids.bump(Variable(1));

        let values = vec![None; 4];
        assert_eq!(vsids.pop_unassigned(&values), Some(Variable(2)));
        assert_eq!(vsids.pop_unassigned(&values), Some(Variable(1)));
        // Ties break toward the lower index.
        assert_eq!(vsids.pop_unassigned(&values), Some(Variable(0)));
        assert_eq!(vsids.pop_unassigned(&values), Some(Variable(3)));
        assert_eq!(vsids.pop_unassigned(&values), None);
    }

    #[test]
    fn skips_assigned_variables_lazily() {
        let mut vsids = Vsids::new(0.95);
        vsids.ensure_vars(3);
        vsids.bump(Variable(0));

        let mut values = vec![None; 3];
        values[0] = Some(true);
        assert_eq!(vsids.pop_unassigned(&values), Some(Variable(1)));
    }

    #[test]
    fn decay_amplifies_later_bumps() {
        let mut vsids = Vsids::new(0.5);
        vsids.ensure_vars(2);
        vsids.bump(Variable(0));
        vsids.decay();
        vsids.bump(Variable(1));
        assert!(vsids.activity(Variable(1)) > vsids.activity(Variable(0)));
    }

    #[test]
    fn rescale_preserves_order() {
        let mut vsids = Vsids::new(0.5);
        vsids.ensure_vars(3);
        // Drive the increment toward the rescale threshold.
        for _ in 0..700 {
            vsids.decay();
            vsids.bump(Variable(1));
        }
        vsids.bump(Variable(2));
        let values = vec![None; 3];
        assert_eq!(vsids.pop_unassigned(&values), Some(Variable(1)));
    }

    #[test]
    fn permute_moves_scores() {
        let mut vsids = Vsids::new(0.95);
        vsids.ensure_vars(3);
        vsids.bump(Variable(0));
        vsids.permute(&[2, 0, 1]);
        vsids.rebuild((0..3).map(Variable));
        let values = vec![None; 3];
        assert_eq!(vsids.pop_unassigned(&values), Some(Variable(2)));
    }
}
