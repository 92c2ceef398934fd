//! Do the stated components add up to the stated total?

use tracing::{debug, warn};

use crate::solver::{Encoding, Relation};
use crate::types::{Claim, ConsistencyStatus, MetricType, SumConsistency};
use crate::verifier::ConstraintVerifier;

/// Currency claims bound to an entity other than the total or a month.
fn is_component(claim: &Claim) -> bool {
    claim.metric_type == MetricType::Currency
        && !claim.is_total()
        && claim.entity.as_deref().is_some_and(|e| !e.contains('-'))
}

impl ConstraintVerifier {
    /// Compare the stated components against the first stated total.
    ///
    /// Returns `None` when there is no total or no component, or when the
    /// values cannot be encoded.
    pub async fn verify_sum_consistency(&self, claims: &[Claim]) -> Option<SumConsistency> {
        let total = claims
            .iter()
            .find(|c| c.metric_type == MetricType::Currency && c.is_total())?
            .value;
        let components: Vec<f64> = claims
            .iter()
            .filter(|c| is_component(c))
            .map(|c| c.value)
            .collect();
        if components.is_empty() {
            return None;
        }

        let relation = Relation::SumConsistency {
            total,
            components: components.clone(),
        };
        let check = match relation.encode(self.tolerances()) {
            Ok(Encoding::Check(check)) => check,
            Ok(Encoding::Undeterminable(_)) => return None,
            Err(err) => {
                warn!(error = %err, "sum consistency skipped");
                return None;
            }
        };

        let proof = self.engine().prove(&check).await;
        let status = if proof.holds {
            ConsistencyStatus::Verified
        } else {
            ConsistencyStatus::Failed
        };
        debug!(?status, components = components.len(), "sum consistency checked");

        Some(SumConsistency {
            total,
            components_sum: components.iter().sum(),
            component_count: components.len(),
            status,
            method: proof.method,
        })
    }
}
