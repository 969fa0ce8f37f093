//! Subsumption and self-subsuming resolution primitives.
//!
//! A clause `C` subsumes `D` when every literal of `C` occurs in `D`;
//! `D` is then implied and can be dropped. If instead every literal of
//! `C` but one occurs in `D` and that one occurs negated, resolving the
//! two on it strengthens `D` by deleting the negated literal
//! (self-subsuming resolution).
//!
//! Candidate pairs are prefiltered with 64-bit clause signatures: the OR
//! of `1 << (var mod 64)` over the clause. `C ⊆ D` requires
//! `sig(C) & ~sig(D) == 0`, so most non-candidates die on two words.
//!
//! These helpers are pure; the occurrence pass and the
//! binary-strengthening tokens drive them.

use crate::literal::Literal;

/// 64-bit variable-set signature of a clause.
#[inline]
pub fn signature(lits: &[Literal]) -> u64 {
    let mut sig = 0u64;
    for lit in lits {
        sig |= 1u64 << (lit.variable().0 % 64);
    }
    sig
}

/// Signature test: can a clause with `sig_sub` possibly subsume one with
/// `sig_super`?
#[inline]
pub fn signature_subset(sig_sub: u64, sig_super: u64) -> bool {
    sig_sub & !sig_super == 0
}

/// Exact subset test; both clauses are duplicate-free.
pub fn is_subset(small: &[Literal], big: &[Literal]) -> bool {
    if small.len() > big.len() {
        return false;
    }
    small.iter().all(|l| big.contains(l))
}

/// Self-subsumption check: if `strengthener` matches `target` except for
/// exactly one literal that occurs negated in `target`, return that
/// negated literal (the one to delete from `target`).
pub fn strengthening_literal(strengthener: &[Literal], target: &[Literal]) -> Option<Literal> {
    if strengthener.len() > target.len() {
        return None;
    }
    let mut flipped: Option<Literal> = None;
    for &lit in strengthener {
        if target.contains(&lit) {
            continue;
        }
        if target.contains(&lit.negated()) {
            if flipped.is_some() {
                return None; // two flips: the resolvent is no shorter
            }
            flipped = Some(lit.negated());
        } else {
            return None;
        }
    }
    flipped
}
