//! Constraint solver trait.

use async_trait::async_trait;

use crate::error::SolverError;
use crate::solver::encoding::LinearCheck;

/// What a solver says about the negation of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverVerdict {
    /// The negation is unsatisfiable: the check holds.
    Unsat,
    /// The negation has a model: the check fails.
    Sat,
    /// The solver gave up.
    Unknown,
}

/// A backend that decides fixed-point checks by refuting their negation.
///
/// Implementations build a fresh solver instance per call; nothing is
/// shared between concurrent calls.
#[async_trait]
pub trait ConstraintSolver: Send + Sync {
    /// Assert the negation of `check` and decide it.
    async fn refute(&self, check: &LinearCheck) -> Result<SolverVerdict, SolverError>;

    /// Backend name for traces and logs.
    fn name(&self) -> &'static str;
}
