//! Constraint solving for numeric relations.
//!
//! Relations are reduced to exact fixed-point checks ([`encoding`]). A
//! [`ProofEngine`] decides each check by asking a [`ConstraintSolver`] to
//! refute its negation, and evaluates the same check directly whenever the
//! solver is absent, fails, times out, or answers `unknown`.
//!
//! ## Backends
//!
//! - [`MockSolver`]: scripted verdicts, for tests
//! - `OxizSolver`: the `OxiZ` SMT solver (requires the `smt` feature)

pub mod encoding;
pub mod engine;
pub mod mock;
pub mod temporal;
pub mod traits;

#[cfg(feature = "smt")]
pub mod oxiz;

pub use encoding::{Encoding, LinearCheck, Relation, SCALE, Tolerances, fx};
pub use engine::{Proof, ProofEngine};
pub use mock::{MockSolver, SolverMode};
pub use temporal::TemporalProperty;
pub use traits::{ConstraintSolver, SolverVerdict};

#[cfg(feature = "smt")]
pub use oxiz::OxizSolver;
