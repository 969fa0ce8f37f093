//! ferrite-sat: a CDCL SAT solver core with scriptable inprocessing.
//!
//! Given a formula in conjunctive normal form (plus optional parity
//! constraints), decide satisfiability and produce a model or an
//! append-only derivation record suitable for UNSAT proof emission.
//!
//! ## Search core
//! - Two-watched-literal propagation with inline binary clauses
//! - First-UIP clause learning with recursive and binary-reachability
//!   minimization, both under adaptive cost budgets
//! - VSIDS activity heap with phase saving and periodic rephasing
//! - Glue-EMA restarts with trail-depth blocking, alternating with Luby
//!   epochs
//! - Tiered redundant-clause database (core / mid / local) with
//!   use-bit protection and an adaptive core cutoff
//!
//! ## Inprocessing
//! A configurable comma-separated schedule drives simplification between
//! search epochs: equivalence replacement over the binary implication
//! graph (SCC), bounded variable elimination with solution
//! reconstruction, subsumption and self-subsuming resolution,
//! vivification, failed-literal and in-tree probing, backbone detection,
//! variable renumbering, and clause-arena consolidation.
//!
//! ## Interfaces
//! The solver is a library: no I/O, no clause formats. Derivations flow
//! through the [`ProofSink`] trait; solution-reconstruction state is
//! serializable for external persistence; cancellation rides an atomic
//! flag checked at conflict and pass boundaries.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod config;
pub mod conflict;
pub mod distill;
pub mod eliminate;
pub mod equiv;
pub mod literal;
pub mod probe;
pub mod proof;
pub mod reconstruct;
pub mod restart;
pub mod simplify;
pub mod solver;
pub mod subsume;
pub mod trail;
pub mod vsids;
pub mod watch;
pub mod xor;

pub use config::{Error, Result, SolverConfig, DEFAULT_SCHEDULE};
pub use literal::{Literal, Variable};
pub use proof::{MemorySink, NullSink, ProofEvent, ProofSink};
pub use reconstruct::{ReconstructionStack, ReconstructionStep};
pub use solver::{SolveResult, SolveStats, Solver};
