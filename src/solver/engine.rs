//! Proof engine: symbolic refutation with arithmetic fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ProofConfig;
use crate::error::SolverError;
use crate::solver::encoding::LinearCheck;
use crate::solver::traits::{ConstraintSolver, SolverVerdict};
use crate::types::ProofMethod;

/// The decision on one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Whether the check holds.
    pub holds: bool,
    /// Which path decided it.
    pub method: ProofMethod,
    /// Why the symbolic path was not used, if it was skipped.
    pub note: Option<String>,
}

impl Proof {
    fn symbolic(holds: bool) -> Self {
        Self {
            holds,
            method: ProofMethod::Symbolic,
            note: None,
        }
    }

    fn fallback(check: &LinearCheck, note: Option<String>) -> Self {
        Self {
            holds: check.holds(),
            method: ProofMethod::Fallback,
            note,
        }
    }
}

/// Decides fixed-point checks, preferring a solver when one is configured.
///
/// Solver errors, `unknown` answers and timeouts all degrade to direct
/// evaluation of the same check.
#[derive(Clone)]
pub struct ProofEngine {
    solver: Option<Arc<dyn ConstraintSolver>>,
    timeout: Duration,
}

impl std::fmt::Debug for ProofEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofEngine")
            .field("solver", &self.solver.as_ref().map(|s| s.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ProofEngine {
    fn default() -> Self {
        Self::from_config(&ProofConfig::default())
    }
}

impl ProofEngine {
    /// An engine that always evaluates directly.
    #[must_use]
    pub fn arithmetic() -> Self {
        Self {
            solver: None,
            timeout: Duration::from_millis(ProofConfig::default().timeout_ms),
        }
    }

    /// An engine backed by `solver` with a per-call budget.
    #[must_use]
    pub fn new(solver: Arc<dyn ConstraintSolver>, timeout_ms: u64) -> Self {
        Self {
            solver: Some(solver),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Build from configuration. Uses OxiZ when the `smt` feature is
    /// enabled and `use_symbolic` is set; otherwise evaluates directly.
    #[must_use]
    pub fn from_config(config: &ProofConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        #[cfg(feature = "smt")]
        if config.use_symbolic {
            return Self {
                solver: Some(Arc::new(crate::solver::oxiz::OxizSolver::new(
                    config.timeout_ms,
                ))),
                timeout,
            };
        }
        Self {
            solver: None,
            timeout,
        }
    }

    /// Name of the configured solver, if any.
    #[must_use]
    pub fn solver_name(&self) -> Option<&'static str> {
        self.solver.as_ref().map(|s| s.name())
    }

    /// Decide `check`.
    pub async fn prove(&self, check: &LinearCheck) -> Proof {
        let Some(solver) = self.solver.as_ref() else {
            return Proof::fallback(check, None);
        };

        match tokio::time::timeout(self.timeout, solver.refute(check)).await {
            Ok(Ok(SolverVerdict::Unsat)) => Proof::symbolic(true),
            Ok(Ok(SolverVerdict::Sat)) => Proof::symbolic(false),
            Ok(Ok(SolverVerdict::Unknown)) => {
                debug!(solver = solver.name(), "solver returned unknown, using fallback");
                Proof::fallback(check, Some("solver returned unknown".into()))
            }
            Ok(Err(err)) => {
                warn!(solver = solver.name(), error = %err, "solver failed, using fallback");
                Proof::fallback(check, Some(err.to_string()))
            }
            Err(_) => {
                let ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                let err = SolverError::Timeout(ms);
                warn!(solver = solver.name(), error = %err, "solver timed out, using fallback");
                Proof::fallback(check, Some(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::mock::{MockSolver, SolverMode};

    fn failing_check() -> LinearCheck {
        LinearCheck::Tolerance {
            lhs: 5_000_000,
            rhs: 4_500_000,
            tol: 10_000,
        }
    }

    #[tokio::test]
    async fn test_arithmetic_engine() {
        let proof = ProofEngine::arithmetic().prove(&failing_check()).await;
        assert!(!proof.holds);
        assert_eq!(proof.method, ProofMethod::Fallback);
        assert!(proof.note.is_none());
    }

    #[tokio::test]
    async fn test_symbolic_verdicts() {
        let solver = Arc::new(MockSolver::new(SolverMode::Faithful));
        let engine = ProofEngine::new(solver.clone(), 1000);
        let proof = engine.prove(&failing_check()).await;
        assert!(!proof.holds);
        assert_eq!(proof.method, ProofMethod::Symbolic);
        assert_eq!(solver.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_errors_degrade() {
        for mode in [SolverMode::Unknown, SolverMode::Fail] {
            let engine = ProofEngine::new(Arc::new(MockSolver::new(mode)), 1000);
            let proof = engine.prove(&failing_check()).await;
            assert!(!proof.holds);
            assert_eq!(proof.method, ProofMethod::Fallback);
            assert!(proof.note.is_some());
        }
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let solver = MockSolver::new(SolverMode::Delay(Duration::from_millis(200)));
        let engine = ProofEngine::new(Arc::new(solver), 10);
        let proof = engine.prove(&failing_check()).await;
        assert_eq!(proof.method, ProofMethod::Fallback);
        assert!(proof.note.as_deref().is_some_and(|n| n.contains("timeout")));
    }

    #[test]
    fn test_default_without_smt_is_arithmetic() {
        #[cfg(not(feature = "smt"))]
        assert_eq!(ProofEngine::default().solver_name(), None);
        #[cfg(feature = "smt")]
        assert_eq!(ProofEngine::default().solver_name(), Some("oxiz"));
    }
}
