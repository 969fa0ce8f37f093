//! Reduction of parity (XOR) constraints to CNF.
//!
//! Outside matrix building, XOR constraints live as plain clauses: a
//! parity over `k` variables needs the `2^(k-1)` sign patterns that ban
//! every odd-one-out assignment. Long parities are cut into short
//! chained equations through fresh carry variables first, so the clause
//! count stays linear in `k`.
//!
//! The solver canonicalizes before encoding (duplicate variables cancel
//! pairwise, fixed variables fold into the right-hand side); this module
//! only turns the cleaned constraint into clauses.

use crate::literal::{Literal, Variable};

/// Parities at most this long are encoded directly.
const DIRECT_LIMIT: usize = 4;
/// Variables consumed per chained equation (plus carries).
const CHUNK: usize = 2;

/// Encode `vars[0] ^ vars[1] ^ ... = rhs` into clauses, calling `fresh`
/// for carry variables as needed. An unsatisfiable parity (empty with
/// `rhs = true`) encodes as the empty clause.
pub fn encode(
    vars: &[Variable],
    rhs: bool,
    mut fresh: impl FnMut() -> Variable,
) -> Vec<Vec<Literal>> {
    let mut out = Vec::new();
    match vars.len() {
        0 => {
            if rhs {
                out.push(Vec::new());
            }
        }
        1 => out.push(vec![vars[0].literal(rhs)]),
        n if n <= DIRECT_LIMIT => {
            let lits: Vec<Literal> = vars.iter().map(|v| v.positive()).collect();
            direct(&lits, rhs, &mut out);
        }
        _ => {
            // Chain: carry_0 = vars[0] ^ vars[1] ^ vars[2], then each
            // further equation consumes CHUNK variables and one carry,
            // and the last equation absorbs the right-hand side.
            let mut carry = {
                let t = fresh();
                let lits = vec![vars[0].positive(), vars[1].positive(), vars[2].positive(), t.positive()];
                direct(&lits, false, &mut out);
                t
            };
            let mut rest = &vars[3..];
            while rest.len() > CHUNK + 1 {
                let t = fresh();
                let mut lits = vec![carry.positive()];
                lits.extend(rest[..CHUNK].iter().map(|v| v.positive()));
                lits.push(t.positive());
                direct(&lits, false, &mut out);
                carry = t;
                rest = &rest[CHUNK..];
            }
            let mut lits = vec![carry.positive()];
            lits.extend(rest.iter().map(|v| v.positive()));
            direct(&lits, rhs, &mut out);
        }
    }
    out
}

/// Direct encoding: every sign pattern whose banned assignment has the
/// wrong parity becomes one clause.
fn direct(lits: &[Literal], rhs: bool, out: &mut Vec<Vec<Literal>>) {
    debug_assert!(lits.len() <= DIRECT_LIMIT + 2);
    for mask in 0u32..1 << lits.len() {
        // The clause with negation mask `mask` bans exactly the
        // assignment that sets the masked variables true; that
        // assignment has parity popcount(mask).
        if mask.count_ones() % 2 != rhs as u32 {
            out.push(
                lits.iter()
                    .enumerate()
                    .map(|(i, &l)| if mask & (1 << i) != 0 { l.negated() } else { l })
                    .collect(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Check by truth table: the CNF over `total_vars` variables is
    /// satisfiable (with carries free) exactly when the parity of the
    /// first `k` variables matches `rhs`.
    fn equisatisfiable(k: usize, rhs: bool) {
        let vars: Vec<Variable> = (0..k as u32).map(Variable).collect();
        let mut next = k as u32;
        let clauses = encode(&vars, rhs, || {
            let v = Variable(next);
            next += 1;
            v
        });
        let total = next as usize;

        for assignment in 0u32..1 << k {
            let parity = assignment.count_ones() % 2 == 1;
            let want = parity == rhs;
            // Existentially quantify the carries.
            let carries = total - k;
            let mut satisfiable = false;
            for aux in 0u32..1 << carries {
                let full = assignment as u64 | (aux as u64) << k;
                let ok = clauses.iter().all(|clause| {
                    clause.iter().any(|l| {
                        let val = full >> l.variable().0 & 1 == 1;
                        val == l.is_positive()
                    })
                });
                if ok {
                    satisfiable = true;
                    break;
                }
            }
            assert_eq!(satisfiable, want, "k={k} rhs={rhs} assignment={assignment:b}");
        }
    }

    #[test]
    fn empty_parity() {
        assert!(encode(&[], false, || unreachable!()).is_empty());
        assert_eq!(encode(&[], true, || unreachable!()), vec![Vec::new()]);
    }

    #[test]
    fn single_variable_is_a_unit() {
        let v = Variable(0);
        assert_eq!(encode(&[v], true, || unreachable!()), vec![vec![v.positive()]]);
        assert_eq!(encode(&[v], false, || unreachable!()), vec![vec![v.negative()]]);
    }

    #[test]
    fn two_variables_encode_equality_or_difference() {
        let vars = [Variable(0), Variable(1)];
        // x0 ^ x1 = 1 means x0 != x1: two clauses.
        let cnf = encode(&vars, true, || unreachable!());
        assert_eq!(cnf.len(), 2);
        assert!(cnf.contains(&vec![Variable(0).positive(), Variable(1).positive()]));
        assert!(cnf.contains(&vec![Variable(0).negative(), Variable(1).negative()]));
    }

    #[test]
    fn direct_encodings_match_truth_tables() {
        for k in 2..=DIRECT_LIMIT {
            equisatisfiable(k, false);
            equisatisfiable(k, true);
        }
    }

    #[test]
    fn chained_encodings_stay_equisatisfiable() {
        for k in DIRECT_LIMIT + 1..=8 {
            equisatisfiable(k, false);
            equisatisfiable(k, true);
        }
    }
}
