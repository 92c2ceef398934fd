//! Scriptable solver for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SolverError;
use crate::solver::encoding::LinearCheck;
use crate::solver::traits::{ConstraintSolver, SolverVerdict};

/// How a [`MockSolver`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverMode {
    /// Decide the check exactly.
    Faithful,
    /// Always answer `unknown`.
    Unknown,
    /// Always fail.
    Fail,
    /// Sleep, then decide exactly.
    Delay(Duration),
}

/// A solver that decides checks by direct evaluation, or misbehaves on
/// request.
#[derive(Debug)]
pub struct MockSolver {
    mode: SolverMode,
    calls: AtomicUsize,
}

impl MockSolver {
    /// Create a mock solver.
    #[must_use]
    pub fn new(mode: SolverMode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `refute` calls so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn decide(check: &LinearCheck) -> SolverVerdict {
        if check.holds() {
            SolverVerdict::Unsat
        } else {
            SolverVerdict::Sat
        }
    }
}

#[async_trait]
impl ConstraintSolver for MockSolver {
    async fn refute(&self, check: &LinearCheck) -> Result<SolverVerdict, SolverError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.mode {
            SolverMode::Faithful => Ok(Self::decide(check)),
            SolverMode::Unknown => Ok(SolverVerdict::Unknown),
            SolverMode::Fail => Err(SolverError::Internal("scripted failure".into())),
            SolverMode::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(Self::decide(check))
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
