//! The inprocessing schedule and its interpreter state.
//!
//! A schedule is a comma-separated token string; tokens run strictly in
//! order between search epochs, each checking the interrupt flag and the
//! time/conflict budgets before doing work. Consecutive `occ-` tokens
//! are accumulated and flushed to the occurrence-list pass as one group,
//! so the (expensive) occurrence lists are built once per group.
//! Unknown tokens are a fatal configuration error, raised when the
//! schedule is parsed rather than mid-run.
//!
//! | token | effect |
//! |---|---|
//! | `scc-vrepl` | equivalence replacement if enough variables changed |
//! | `must-scc-vrepl` | equivalence replacement unconditionally |
//! | `sub-impl` | subsume binary clauses with binary clauses |
//! | `sub-str-cls-with-bin` | subsume and strengthen long clauses using binaries |
//! | `sub-cls-with-bin` | subsume-only variant of the above |
//! | `distill-bins` / `distill-cls` / `distill-litrem` | distillation variants |
//! | `str-impl` | strengthen binaries with each other |
//! | `clean-cls` | drop satisfied clauses, strip false literals |
//! | `intree-probe` | probe roots of the binary implication graph |
//! | `full-probe` | failed-literal probing to a fixed point |
//! | `cl-consolidate` | force an arena consolidation |
//! | `renumber` / `must-renumber` | variable renumbering |
//! | `backbone` | backbone detection |
//! | `occ-backw-sub-str`, `occ-bve` | occurrence-list sub-schedule |

use crate::config::{Error, Result};

/// Sub-tokens of a grouped occurrence-list pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccToken {
    /// Backward subsumption and self-subsuming resolution.
    BackwSubStr,
    /// Bounded variable elimination.
    Bve,
}

/// One schedule step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Equivalence replacement; `force` skips the change-rate gate.
    SccVrepl {
        /// Run even when few variables changed since the last round.
        force: bool,
    },
    /// Binary-with-binary subsumption (plus transitive reduction when no
    /// proof is being recorded).
    SubImpl,
    /// Long-clause subsumption by binaries; `strengthen` also removes
    /// negated occurrences.
    SubStrClsWithBin {
        /// Apply self-subsuming resolution, not just subsumption.
        strengthen: bool,
    },
    /// Vivify binary clauses.
    DistillBins,
    /// Vivify long clauses.
    DistillCls,
    /// Literal-removal-only vivification.
    DistillLitrem,
    /// Strengthen binaries against each other (shared-variable resolution).
    StrImpl,
    /// Drop satisfied clauses and strip false literals at level 0.
    CleanCls,
    /// Probe implication-graph roots.
    IntreeProbe,
    /// Probe all unassigned literals to a fixed point.
    FullProbe,
    /// Force an arena consolidation.
    Consolidate,
    /// Renumber variables; `force` ignores the dead-variable threshold.
    Renumber {
        /// Renumber even below the dead-variable threshold.
        force: bool,
    },
    /// Backbone detection over the last model.
    Backbone,
    /// A grouped occurrence-list sub-schedule.
    Occ(Vec<OccToken>),
}

/// Parse a schedule string; unknown tokens are fatal.
pub fn parse_schedule(schedule: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut occ_group: Vec<OccToken> = Vec::new();

    for raw in schedule.split(',') {
        let word = raw.trim();
        if word.is_empty() {
            continue;
        }
        if let Some(occ) = word.strip_prefix("occ-") {
            let sub = match occ {
                "backw-sub-str" => OccToken::BackwSubStr,
                "bve" => OccToken::Bve,
                _ => return Err(Error::UnknownToken(word.to_string())),
            };
            occ_group.push(sub);
            continue;
        }
        if !occ_group.is_empty() {
            tokens.push(Token::Occ(std::mem::take(&mut occ_group)));
        }
        let token = match word {
            "scc-vrepl" => Token::SccVrepl { force: false },
            "must-scc-vrepl" => Token::SccVrepl { force: true },
            "sub-impl" => Token::SubImpl,
            "sub-str-cls-with-bin" => Token::SubStrClsWithBin { strengthen: true },
            "sub-cls-with-bin" => Token::SubStrClsWithBin { strengthen: false },
            "distill-bins" => Token::DistillBins,
            "distill-cls" => Token::DistillCls,
            "distill-litrem" => Token::DistillLitrem,
            "str-impl" => Token::StrImpl,
            "clean-cls" => Token::CleanCls,
            "intree-probe" => Token::IntreeProbe,
            "full-probe" => Token::FullProbe,
            "cl-consolidate" => Token::Consolidate,
            "renumber" => Token::Renumber { force: false },
            "must-renumber" => Token::Renumber { force: true },
            "backbone" => Token::Backbone,
            _ => return Err(Error::UnknownToken(word.to_string())),
        };
        tokens.push(token);
    }
    if !occ_group.is_empty() {
        tokens.push(Token::Occ(occ_group));
    }
    Ok(tokens)
}

/// Counters for the schedule interpreter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpStats {
    /// Full schedule runs started.
    pub runs: u64,
    /// Tokens executed.
    pub tokens_run: u64,
    /// Runs cut short by interrupt or budget.
    pub early_exits: u64,
}

/// Parsed schedule plus interpreter counters; execution lives on the
/// solver, which owns the storage every pass mutates.
#[derive(Debug)]
pub struct Simplifier {
    tokens: Vec<Token>,
    /// Interpreter counters.
    pub stats: SimpStats,
    /// Free-variable count at the end of the last equivalence round,
    /// used by the `scc-vrepl` change-rate gate.
    pub free_vars_at_last_scc: usize,
}

impl Simplifier {
    /// Parse and keep a schedule.
    pub fn new(schedule: &str) -> Result<Self> {
        Ok(Simplifier {
            tokens: parse_schedule(schedule)?,
            stats: SimpStats::default(),
            free_vars_at_last_scc: usize::MAX,
        })
    }

    /// The parsed schedule.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_parses() {
        let tokens = parse_schedule(crate::config::DEFAULT_SCHEDULE).unwrap();
        assert!(tokens.contains(&Token::SubImpl));
        assert!(tokens.iter().any(|t| matches!(t, Token::Occ(_))));
    }

    #[test]
    fn occ_tokens_group_into_one_pass() {
        let tokens =
            parse_schedule("clean-cls, occ-backw-sub-str, occ-bve, sub-impl").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::CleanCls,
                Token::Occ(vec![OccToken::BackwSubStr, OccToken::Bve]),
                Token::SubImpl,
            ]
        );
    }

    #[test]
    fn trailing_occ_group_is_flushed() {
        let tokens = parse_schedule("sub-impl, occ-bve").unwrap();
        assert_eq!(
            tokens,
            vec![Token::SubImpl, Token::Occ(vec![OccToken::Bve])]
        );
    }

    #[test]
    fn must_variants_force() {
        let tokens = parse_schedule("must-scc-vrepl, must-renumber").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::SccVrepl { force: true },
                Token::Renumber { force: true }
            ]
        );
    }

    #[test]
    fn unknown_tokens_are_fatal() {
        assert!(matches!(
            parse_schedule("scc-vrepl, occ-gauss"),
            Err(Error::UnknownToken(_))
        ));
        assert!(matches!(
            parse_schedule("gauss"),
            Err(Error::UnknownToken(_))
        ));
    }

    #[test]
    fn whitespace_and_empty_entries_are_tolerated() {
        let tokens = parse_schedule("  clean-cls , , sub-impl  ").unwrap();
        assert_eq!(tokens, vec![Token::CleanCls, Token::SubImpl]);
    }
}
