//! Properties over a value series, such as monthly totals.

use serde::{Deserialize, Serialize};

use crate::error::SolverError;
use crate::solver::encoding::{LinearCheck, fx};
use crate::solver::engine::{Proof, ProofEngine};

/// A property that must hold at every point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "property", content = "threshold", rename_all = "snake_case")]
pub enum TemporalProperty {
    /// No value is above the threshold.
    NeverExceeds(f64),
    /// No value is below its predecessor.
    AlwaysIncreases,
}

impl TemporalProperty {
    /// Short name for traces.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NeverExceeds(_) => "never_exceeds",
            Self::AlwaysIncreases => "always_increases",
        }
    }

    /// Encode the property over `series`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Overflow`] when a value cannot be encoded.
    pub fn encode(&self, series: &[f64]) -> Result<LinearCheck, SolverError> {
        let values = series
            .iter()
            .map(|v| fx(*v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match self {
            Self::NeverExceeds(threshold) => LinearCheck::AllAtMost {
                values,
                bound: fx(*threshold)?,
            },
            Self::AlwaysIncreases => LinearCheck::NonDecreasing { values },
        })
    }
}

impl ProofEngine {
    /// Decide a temporal property over `series`. An empty series satisfies
    /// every property.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Overflow`] when a value cannot be encoded.
    pub async fn prove_property(
        &self,
        series: &[f64],
        property: TemporalProperty,
    ) -> Result<Proof, SolverError> {
        let check = property.encode(series)?;
        Ok(self.prove(&check).await)
    }
}
