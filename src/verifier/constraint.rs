//! Per-claim routing from metric type to relation, and the verdicts that
//! come back.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::ProofConfig;
use crate::extraction::split_sentences;
use crate::solver::{Encoding, Proof, ProofEngine, Relation, Tolerances};
use crate::text::contains_word;
use crate::types::{
    BudgetContext, Claim, Interval, MetricType, ProofMethod, StepStatus, TOTAL_ENTITY,
};

/// The outcome of checking one claim.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The relation holds.
    Holds(Proof),
    /// The relation fails. `correction` is `None` when no single right
    /// value exists.
    Violated {
        /// The decision.
        proof: Proof,
        /// What the claim should have said.
        correction: Option<f64>,
    },
    /// No relation could be formed; the claim passes unpenalized.
    Unchecked(String),
    /// The claim needs checking but cannot be checked.
    Unverifiable(String),
}

impl Verdict {
    /// The step status this verdict maps to.
    #[must_use]
    pub fn status(&self) -> StepStatus {
        match self {
            Self::Holds(_) | Self::Unchecked(_) => StepStatus::Verified,
            Self::Violated {
                correction: Some(_),
                ..
            } => StepStatus::Corrected,
            Self::Violated {
                correction: None, ..
            }
            | Self::Unverifiable(_) => StepStatus::Unverified,
        }
    }

    /// The corrected value, if any.
    #[must_use]
    pub fn correction(&self) -> Option<f64> {
        match self {
            Self::Violated { correction, .. } => *correction,
            _ => None,
        }
    }

    /// Which path decided the relation, if one was evaluated.
    #[must_use]
    pub fn method(&self) -> Option<ProofMethod> {
        match self {
            Self::Holds(proof) | Self::Violated { proof, .. } => Some(proof.method),
            _ => None,
        }
    }

    /// Skip reason or solver degradation note.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Holds(proof) | Self::Violated { proof, .. } => proof.note.as_deref(),
            Self::Unchecked(reason) | Self::Unverifiable(reason) => Some(reason),
        }
    }

    /// Whether the claim ended without a penalty.
    #[must_use]
    pub fn passed(&self) -> bool {
        matches!(self, Self::Holds(_) | Self::Unchecked(_))
    }
}

enum Route {
    Check(Relation),
    Skip(Verdict),
}

fn unchecked(reason: impl Into<String>) -> Route {
    Route::Skip(Verdict::Unchecked(reason.into()))
}

/// Checks claims against the budget context.
#[derive(Debug, Clone, Default)]
pub struct ConstraintVerifier {
    engine: ProofEngine,
    tolerances: Tolerances,
}

impl ConstraintVerifier {
    /// Create a verifier from a proof engine and tolerances.
    #[must_use]
    pub fn new(engine: ProofEngine, tolerances: Tolerances) -> Self {
        Self { engine, tolerances }
    }

    /// Build from configuration.
    #[must_use]
    pub fn from_config(config: &ProofConfig) -> Self {
        Self::new(ProofEngine::from_config(config), Tolerances::from(config))
    }

    /// The proof engine.
    #[must_use]
    pub fn engine(&self) -> &ProofEngine {
        &self.engine
    }

    /// The tolerances in use.
    #[must_use]
    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Check one claim. Inequality and range claims get their uncertainty
    /// interval attached.
    pub async fn verify_claim(
        &self,
        claim: &mut Claim,
        text: &str,
        context: &BudgetContext,
    ) -> Verdict {
        let relation = match Self::route(claim, text, context) {
            Route::Check(relation) => relation,
            Route::Skip(verdict) => return verdict,
        };
        self.decide(&relation).await
    }

    /// Decide a relation and attach its correction on failure.
    pub async fn decide(&self, relation: &Relation) -> Verdict {
        let check = match relation.encode(&self.tolerances) {
            Ok(Encoding::Check(check)) => check,
            Ok(Encoding::Undeterminable(reason)) => return Verdict::Unchecked(reason.into()),
            Err(err) => return Verdict::Unverifiable(err.to_string()),
        };

        let proof = self.engine.prove(&check).await;
        debug!(
            relation = relation.name(),
            holds = proof.holds,
            method = %proof.method,
            "relation decided"
        );
        if proof.holds {
            Verdict::Holds(proof)
        } else {
            Verdict::Violated {
                proof,
                correction: relation.correction(),
            }
        }
    }

    fn route(claim: &mut Claim, text: &str, context: &BudgetContext) -> Route {
        let claimed = claim.value;
        match claim.metric_type {
            MetricType::Currency => {
                let Some(entity) = claim.entity.as_deref() else {
                    return unchecked("no entity bound");
                };
                match context.amount_for(entity) {
                    Some(actual) => Route::Check(Relation::Currency { claimed, actual }),
                    None => unchecked(format!("{entity} has no recorded amount")),
                }
            }
            MetricType::Temporal => {
                let month = claim.entity.as_deref().unwrap_or_default();
                match context.monthly_summary.get(month) {
                    Some(&actual) => Route::Check(Relation::MonthTotal { claimed, actual }),
                    None => Route::Skip(Verdict::Unverifiable(format!(
                        "no monthly total for {month}"
                    ))),
                }
            }
            MetricType::Count => Route::Check(Relation::Count {
                claimed,
                actual: context.entry_count,
            }),
            MetricType::Average => Route::Check(Relation::Average {
                claimed,
                total: context.total_expenses,
                count: context.entry_count,
            }),
            MetricType::Percentage => {
                let part = claim
                    .entity
                    .as_deref()
                    .filter(|e| *e != TOTAL_ENTITY)
                    .and_then(|e| category_or_project(context, e))
                    .filter(|v| *v != 0.0);
                match part {
                    Some(part) => Route::Check(Relation::Percentage {
                        claimed,
                        part,
                        total: context.total_expenses,
                    }),
                    None => unchecked("no category or project share to compare"),
                }
            }
            MetricType::Ratio => {
                let Some(entity) = claim.entity.as_deref() else {
                    return unchecked("no entity bound");
                };
                let Some(numerator) = context.amount_for(entity) else {
                    return unchecked(format!("{entity} has no recorded amount"));
                };
                match ratio_base(claim, text, context) {
                    Some(denominator) => Route::Check(Relation::Ratio {
                        claimed,
                        numerator,
                        denominator,
                    }),
                    None => unchecked("no base entity for ratio"),
                }
            }
            MetricType::Trend => {
                if !claim.is_total() {
                    return unchecked("trends are only recorded for total spending");
                }
                match context.previous_month_total() {
                    Some(previous) => Route::Check(Relation::Trend {
                        claimed,
                        current: context.total_expenses,
                        previous,
                    }),
                    None => unchecked("fewer than two months recorded"),
                }
            }
            MetricType::InequalityGt | MetricType::InequalityLt => {
                let Some(actual) = claim.entity.as_deref().and_then(|e| context.amount_for(e))
                else {
                    return unchecked("no recorded amount to compare");
                };
                if claim.metric_type == MetricType::InequalityGt {
                    claim.uncertainty_interval = Some(Interval::above(claimed));
                    Route::Check(Relation::GreaterThan {
                        actual,
                        bound: claimed,
                    })
                } else {
                    claim.uncertainty_interval = Some(Interval::below(claimed));
                    Route::Check(Relation::LessThan {
                        actual,
                        bound: claimed,
                    })
                }
            }
            MetricType::Range => {
                let Some(actual) = claim.entity.as_deref().and_then(|e| context.amount_for(e))
                else {
                    return unchecked("no recorded amount to compare");
                };
                let Some(max) = claim.secondary_value else {
                    return Route::Skip(Verdict::Unverifiable("range without upper bound".into()));
                };
                claim.uncertainty_interval = Some(Interval::between(claimed, max));
                Route::Check(Relation::Range {
                    actual,
                    min: claimed,
                    max,
                })
            }
            MetricType::SemanticInference => {
                Route::Skip(Verdict::Unverifiable("no numeric relation".into()))
            }
        }
    }
}

fn category_or_project(context: &BudgetContext, entity: &str) -> Option<f64> {
    context
        .categories
        .get(entity)
        .or_else(|| context.projects.get(entity))
        .copied()
}

/// The amount a ratio is taken against: the one other known category or
/// project named in the claim's sentence, else total spending when the
/// sentence says "total". Two or more named bases leave the ratio
/// undeterminable.
fn ratio_base(claim: &Claim, text: &str, context: &BudgetContext) -> Option<f64> {
    let sentence = split_sentences(text)
        .into_iter()
        .find(|s| s.start <= claim.span.start && claim.span.start < s.end())
        .map_or(claim.original_text.as_str(), |s| s.text);

    let own = claim.entity.as_deref();
    let bases: BTreeSet<&str> = context
        .semantic_targets()
        .filter(|name| Some(*name) != own && contains_word(sentence, name))
        .collect();
    match bases.len() {
        0 => contains_word(&sentence.to_lowercase(), "total").then_some(context.total_expenses),
        1 => bases
            .first()
            .and_then(|base| category_or_project(context, base)),
        _ => None,
    }
}
