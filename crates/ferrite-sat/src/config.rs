//! Solver configuration and the error taxonomy.
//!
//! Everything tunable at construction time lives in [`SolverConfig`]; the
//! schedule string and numeric ranges are validated once when the solver
//! is built, so a bad configuration fails before any clause is touched.

use thiserror::Error;

use crate::simplify;

/// Errors surfaced by the public API.
///
/// Configuration and input errors abort the operation that raised them;
/// capacity errors fail a single clause addition and leave the solver
/// usable. UNSAT discovery and budget exhaustion are not errors: they are
/// reported through [`crate::SolveResult`] and the solver status.
#[derive(Debug, Error)]
pub enum Error {
    /// The simplifier schedule contains a token the interpreter does not know.
    #[error("unknown simplifier token `{0}` in schedule")]
    UnknownToken(String),
    /// The Tier-0 glue cutoff must stay within the tier layout.
    #[error("tier-0 glue cutoff {0} out of range 1..=6")]
    GlueCutoffOutOfRange(u32),
    /// The activity decay must be a proper damping factor.
    #[error("variable activity decay {0} outside the open interval (0, 1)")]
    VarDecayOutOfRange(f64),
    /// A literal referenced a variable that was never declared.
    #[error("variable x{0} out of range: {1} variables declared")]
    VariableOutOfRange(u32, usize),
    /// Sampling weights may be assigned at most once per variable.
    #[error("sampling weight already assigned to variable x{0}")]
    DuplicateWeight(u32),
    /// A new clause mentioned a variable removed by variable elimination.
    ///
    /// Elimination is not reversible once resolvents replaced the
    /// original clauses, so this is fatal rather than recoverable.
    #[error("variable x{0} was eliminated by simplification and cannot appear in new clauses")]
    EliminatedVariable(u32),
    /// Clause bodies are limited to 2^28 literals by the arena header layout.
    #[error("clause with {0} literals exceeds the arena limit of 2^28")]
    ClauseTooLong(usize),
    /// The 32-bit clause arena ran out of addressable words.
    #[error("clause arena exhausted (32-bit handle space)")]
    ArenaExhausted,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The inprocessing schedule used when none is configured.
///
/// Tokens run left to right between search epochs; consecutive `occ-`
/// tokens are grouped into one occurrence-list pass.
pub const DEFAULT_SCHEDULE: &str = "sub-impl, scc-vrepl, distill-cls, sub-str-cls-with-bin, \
     str-impl, clean-cls, occ-backw-sub-str, occ-bve, intree-probe, renumber, cl-consolidate";

/// Tunable knobs for a [`crate::Solver`].
///
/// Defaults follow the shapes the search requires (adaptive budgets,
/// growing intervals); the absolute numbers are tuning, not contract.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Comma-separated inprocessing schedule (see the token table in the
    /// simplifier module). Unknown tokens fail validation.
    pub schedule: String,
    /// Learned clauses with glue at or below this never leave the database.
    pub tier0_glue_cutoff: u32,
    /// Variable activity damping per conflict.
    pub var_decay: f64,
    /// Seed for polarity perturbation; equal seeds give equal runs.
    pub seed: u64,
    /// Conflicts before the first redundant-clause sweep.
    pub reduce_first: u64,
    /// Additional conflicts between consecutive sweeps.
    pub reduce_interval: u64,
    /// Conflicts per search epoch before the simplifier runs.
    pub simplify_interval: u64,
    /// Run startup simplification and inter-epoch inprocessing at all.
    pub simplify: bool,
    /// Additive slack on the resolvent count allowed by variable elimination.
    pub elim_clause_slack: usize,
    /// Resolvents longer than this block elimination of their pivot.
    pub elim_max_resolvent: usize,
    /// Propagation budget per distillation call.
    pub distill_budget: u64,
    /// Propagation budget per probing call.
    pub probe_budget: u64,
    /// Fraction of dead variables that triggers renumbering.
    pub renumber_dead_fraction: f64,
    /// Freed fraction of the arena that triggers consolidation.
    pub consolidate_wasted_fraction: f64,
    /// Conflicts between polarity-strategy rotations.
    pub rephase_interval: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            schedule: DEFAULT_SCHEDULE.to_string(),
            tier0_glue_cutoff: 2,
            var_decay: 0.95,
            seed: 0,
            reduce_first: 2000,
            reduce_interval: 300,
            simplify_interval: 8000,
            simplify: true,
            elim_clause_slack: 0,
            elim_max_resolvent: 64,
            distill_budget: 200_000,
            probe_budget: 200_000,
            renumber_dead_fraction: 0.2,
            consolidate_wasted_fraction: 0.3,
            rephase_interval: 1000,
        }
    }
}

impl SolverConfig {
    /// Check ranges and parse the schedule; called by the solver constructor.
    pub fn validate(&self) -> Result<()> {
        if !(1..=6).contains(&self.tier0_glue_cutoff) {
            return Err(Error::GlueCutoffOutOfRange(self.tier0_glue_cutoff));
        }
        if !(self.var_decay > 0.0 && self.var_decay < 1.0) {
            return Err(Error::VarDecayOutOfRange(self.var_decay));
        }
        simplify::parse_schedule(&self.schedule).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        SolverConfig::default().validate().unwrap();
    }

    #[test]
    fn unknown_token_is_fatal() {
        let cfg = SolverConfig {
            schedule: "scc-vrepl, frobnicate".to_string(),
            ..SolverConfig::default()
        };
        match cfg.validate() {
            Err(Error::UnknownToken(tok)) => assert_eq!(tok, "frobnicate"),
            other => panic!("expected UnknownToken, got {other:?}"),
        }
    }

    #[test]
    fn cutoff_range_is_checked() {
        let cfg = SolverConfig {
            tier0_glue_cutoff: 9,
            ..SolverConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::GlueCutoffOutOfRange(9))));
    }
}
