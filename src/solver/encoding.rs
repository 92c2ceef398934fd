//! Relation table and fixed-point encoding.
//!
//! Every relation is reduced to one [`LinearCheck`] over exact integers
//! (four decimal places). Both the solver and the arithmetic fallback decide
//! that same check. Operands stay separate in the check so the solver does
//! the multiplication and summation itself.

use serde::{Deserialize, Serialize};

use crate::config::ProofConfig;
use crate::error::SolverError;

/// Fixed-point scale: values are stored in units of `1 / SCALE`.
pub const SCALE: i128 = 10_000;

/// Largest magnitude accepted for encoding. Products of two encoded values
/// stay well inside `i128`.
pub const MAX_MAGNITUDE: f64 = 1e12;

/// Encode a value in fixed point, rounding to the nearest unit.
///
/// # Errors
///
/// Returns [`SolverError::Overflow`] for non-finite values or values beyond
/// [`MAX_MAGNITUDE`].
pub fn fx(value: f64) -> Result<i128, SolverError> {
    if !value.is_finite() || value.abs() > MAX_MAGNITUDE {
        return Err(SolverError::Overflow(format!("{value}")));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    Ok((value * SCALE as f64).round() as i128)
}

/// A decidable linear fact over fixed-point integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LinearCheck {
    /// `|lhs - rhs| <= tol`
    Tolerance {
        /// Left-hand side.
        lhs: i128,
        /// Right-hand side.
        rhs: i128,
        /// Allowed absolute deviation.
        tol: i128,
    },
    /// `|claimed * base - (target - offset) * weight| <= tol`
    ///
    /// Derived relations (averages, shares, ratios, trends) keep their
    /// operands apart so a solver sees the products.
    Proportion {
        /// The stated figure.
        claimed: i128,
        /// What the stated figure is taken relative to.
        base: i128,
        /// The recorded figure.
        target: i128,
        /// Subtracted from `target` before weighting.
        offset: i128,
        /// Unit conversion applied to `target - offset`.
        weight: i128,
        /// Allowed absolute deviation of the two products.
        tol: i128,
    },
    /// `|sum(parts) - total| <= tol`
    Sum {
        /// Components.
        parts: Vec<i128>,
        /// Stated total.
        total: i128,
        /// Allowed absolute deviation.
        tol: i128,
    },
    /// `value > bound`
    Above {
        /// Checked value.
        value: i128,
        /// Exclusive lower bound.
        bound: i128,
    },
    /// `value < bound`
    Below {
        /// Checked value.
        value: i128,
        /// Exclusive upper bound.
        bound: i128,
    },
    /// `lo < value < hi`
    Between {
        /// Checked value.
        value: i128,
        /// Exclusive lower bound.
        lo: i128,
        /// Exclusive upper bound.
        hi: i128,
    },
    /// Every value `<= bound`.
    AllAtMost {
        /// Series.
        values: Vec<i128>,
        /// Inclusive bound.
        bound: i128,
    },
    /// `values[i + 1] >= values[i]` for every adjacent pair.
    NonDecreasing {
        /// Series.
        values: Vec<i128>,
    },
}

impl LinearCheck {
    /// Decide the check directly.
    #[must_use]
    pub fn holds(&self) -> bool {
        match self {
            Self::Tolerance { lhs, rhs, tol } => (lhs - rhs).abs() <= *tol,
            Self::Proportion {
                claimed,
                base,
                target,
                offset,
                weight,
                tol,
            } => (claimed * base - (target - offset) * weight).abs() <= *tol,
            Self::Sum { parts, total, tol } => (parts.iter().sum::<i128>() - total).abs() <= *tol,
            Self::Above { value, bound } => value > bound,
            Self::Below { value, bound } => value < bound,
            Self::Between { value, lo, hi } => lo < value && value < hi,
            Self::AllAtMost { values, bound } => values.iter().all(|v| v <= bound),
            Self::NonDecreasing { values } => values.windows(2).all(|w| w[1] >= w[0]),
        }
    }
}

/// Per-relation tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Currency and monthly totals.
    pub currency: f64,
    /// Transaction counts.
    pub count: f64,
    /// Averages, percentages, ratios and trends.
    pub derived: f64,
    /// Sum of components versus total.
    pub sum: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::from(&ProofConfig::default())
    }
}

impl From<&ProofConfig> for Tolerances {
    fn from(config: &ProofConfig) -> Self {
        Self {
            currency: config.currency_epsilon,
            count: config.count_epsilon,
            derived: config.derived_epsilon,
            sum: config.sum_epsilon,
        }
    }
}

/// A relation between a claimed value and the context values it depends on.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// `|claimed - actual| <= eps`
    Currency {
        /// Stated amount.
        claimed: f64,
        /// Recorded amount.
        actual: f64,
    },
    /// `|claimed - entries| <= eps`
    Count {
        /// Stated count.
        claimed: f64,
        /// Recorded count.
        actual: u64,
    },
    /// `claimed * count == total` within `eps * count`
    Average {
        /// Stated average.
        claimed: f64,
        /// Recorded total.
        total: f64,
        /// Recorded entries.
        count: u64,
    },
    /// `claimed * total == part * 100` within `eps * |total|`
    Percentage {
        /// Stated percentage.
        claimed: f64,
        /// Entity amount.
        part: f64,
        /// Total spending.
        total: f64,
    },
    /// `claimed * denominator == numerator` within `eps`
    Ratio {
        /// Stated multiple.
        claimed: f64,
        /// Entity amount.
        numerator: f64,
        /// Base amount.
        denominator: f64,
    },
    /// `claimed * previous == (current - previous) * 100` within `eps * |previous|`
    Trend {
        /// Stated change in percent.
        claimed: f64,
        /// Latest month.
        current: f64,
        /// Month before.
        previous: f64,
    },
    /// `actual > bound`
    GreaterThan {
        /// Recorded amount.
        actual: f64,
        /// Stated bound.
        bound: f64,
    },
    /// `actual < bound`
    LessThan {
        /// Recorded amount.
        actual: f64,
        /// Stated bound.
        bound: f64,
    },
    /// `min < actual < max`
    Range {
        /// Recorded amount.
        actual: f64,
        /// Stated lower bound.
        min: f64,
        /// Stated upper bound.
        max: f64,
    },
    /// `|claimed - month total| <= eps`
    MonthTotal {
        /// Stated amount.
        claimed: f64,
        /// Recorded month total.
        actual: f64,
    },
    /// `|sum(components) - total| <= eps`
    SumConsistency {
        /// Stated total.
        total: f64,
        /// Stated components.
        components: Vec<f64>,
    },
}

/// The outcome of encoding a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// A check both paths can decide.
    Check(LinearCheck),
    /// The inputs make the relation meaningless (zero divisor).
    Undeterminable(&'static str),
}

impl Relation {
    /// Short name for traces.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Currency { .. } => "currency",
            Self::Count { .. } => "count",
            Self::Average { .. } => "average",
            Self::Percentage { .. } => "percentage",
            Self::Ratio { .. } => "ratio",
            Self::Trend { .. } => "trend",
            Self::GreaterThan { .. } => "inequality_gt",
            Self::LessThan { .. } => "inequality_lt",
            Self::Range { .. } => "range",
            Self::MonthTotal { .. } => "temporal",
            Self::SumConsistency { .. } => "sum_consistency",
        }
    }

    /// Reduce the relation to a fixed-point check.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Overflow`] when an operand cannot be encoded.
    pub fn encode(&self, tol: &Tolerances) -> Result<Encoding, SolverError> {
        let hundred = 100 * SCALE;
        let check = match self {
            Self::Currency { claimed, actual } | Self::MonthTotal { claimed, actual } => {
                LinearCheck::Tolerance {
                    lhs: fx(*claimed)?,
                    rhs: fx(*actual)?,
                    tol: fx(tol.currency)?,
                }
            }
            Self::Count { claimed, actual } => LinearCheck::Tolerance {
                lhs: fx(*claimed)?,
                rhs: i128::from(*actual) * SCALE,
                tol: fx(tol.count)?,
            },
            Self::Average {
                claimed,
                total,
                count,
            } => {
                if *count == 0 {
                    return Ok(Encoding::Undeterminable("no entries to average over"));
                }
                let n = i128::from(*count);
                LinearCheck::Proportion {
                    claimed: fx(*claimed)?,
                    base: n,
                    target: fx(*total)?,
                    offset: 0,
                    weight: 1,
                    tol: fx(tol.derived)? * n,
                }
            }
            Self::Percentage {
                claimed,
                part,
                total,
            } => {
                let total = fx(*total)?;
                if total == 0 {
                    return Ok(Encoding::Undeterminable("total spending is zero"));
                }
                LinearCheck::Proportion {
                    claimed: fx(*claimed)?,
                    base: total,
                    target: fx(*part)?,
                    offset: 0,
                    weight: hundred,
                    tol: fx(tol.derived)? * total.abs(),
                }
            }
            Self::Ratio {
                claimed,
                numerator,
                denominator,
            } => {
                let denominator = fx(*denominator)?;
                if denominator == 0 {
                    return Ok(Encoding::Undeterminable("base amount is zero"));
                }
                LinearCheck::Proportion {
                    claimed: fx(*claimed)?,
                    base: denominator,
                    target: fx(*numerator)?,
                    offset: 0,
                    weight: SCALE,
                    tol: fx(tol.derived)? * SCALE,
                }
            }
            Self::Trend {
                claimed,
                current,
                previous,
            } => {
                let previous = fx(*previous)?;
                if previous == 0 {
                    return Ok(Encoding::Undeterminable("previous month is zero"));
                }
                LinearCheck::Proportion {
                    claimed: fx(*claimed)?,
                    base: previous,
                    target: fx(*current)?,
                    offset: previous,
                    weight: hundred,
                    tol: fx(tol.derived)? * previous.abs(),
                }
            }
            Self::GreaterThan { actual, bound } => LinearCheck::Above {
                value: fx(*actual)?,
                bound: fx(*bound)?,
            },
            Self::LessThan { actual, bound } => LinearCheck::Below {
                value: fx(*actual)?,
                bound: fx(*bound)?,
            },
            Self::Range { actual, min, max } => LinearCheck::Between {
                value: fx(*actual)?,
                lo: fx(*min)?,
                hi: fx(*max)?,
            },
            Self::SumConsistency { total, components } => LinearCheck::Sum {
                parts: components
                    .iter()
                    .map(|c| fx(*c))
                    .collect::<Result<_, _>>()?,
                total: fx(*total)?,
                tol: fx(tol.sum)?,
            },
        };
        Ok(Encoding::Check(check))
    }

    /// The value the claim should have stated, when one is well defined.
    #[must_use]
    pub fn correction(&self) -> Option<f64> {
        match self {
            Self::Currency { actual, .. }
            | Self::MonthTotal { actual, .. }
            | Self::Range { actual, .. } => Some(*actual),
            #[allow(clippy::cast_precision_loss)]
            Self::Count { actual, .. } => Some(*actual as f64),
            #[allow(clippy::cast_precision_loss)]
            Self::Average { total, count, .. } => {
                (*count > 0).then(|| total / *count as f64)
            }
            Self::Percentage { part, total, .. } => {
                (*total != 0.0).then(|| part / total * 100.0)
            }
            Self::Ratio {
                numerator,
                denominator,
                ..
            } => (*denominator != 0.0).then(|| numerator / denominator),
            Self::Trend {
                current, previous, ..
            } => (*previous != 0.0).then(|| (current - previous) / previous * 100.0),
            Self::GreaterThan { .. } | Self::LessThan { .. } | Self::SumConsistency { .. } => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(relation: &Relation) -> LinearCheck {
        match relation.encode(&Tolerances::default()).unwrap() {
            Encoding::Check(check) => check,
            Encoding::Undeterminable(reason) => panic!("undeterminable: {reason}"),
        }
    }

    #[test]
    fn test_fx_rounds_and_rejects() {
        assert_eq!(fx(1.5).unwrap(), 15_000);
        assert_eq!(fx(0.000_06).unwrap(), 1);
        assert!(fx(f64::NAN).is_err());
        assert!(fx(1e13).is_err());
    }

    #[test]
    fn test_currency_epsilon_is_inclusive() {
        assert!(check(&Relation::Currency {
            claimed: 451.0,
            actual: 450.0
        })
        .holds());
        assert!(!check(&Relation::Currency {
            claimed: 451.01,
            actual: 450.0
        })
        .holds());
    }

    #[test]
    fn test_average_scales_tolerance_by_count() {
        let ok = Relation::Average {
            claimed: 37.55,
            total: 450.0,
            count: 12,
        };
        assert!(check(&ok).holds());
        let bad = Relation::Average {
            claimed: 40.0,
            total: 450.0,
            count: 12,
        };
        assert!(!check(&bad).holds());
        assert_eq!(bad.correction(), Some(37.5));
    }

    #[test]
    fn test_percentage_relation() {
        let rel = Relation::Percentage {
            claimed: 11.1,
            part: 50.0,
            total: 450.0,
        };
        assert!(check(&rel).holds());
        let wrong = Relation::Percentage {
            claimed: 20.0,
            part: 50.0,
            total: 450.0,
        };
        assert!(!check(&wrong).holds());
        let pct = wrong.correction().unwrap();
        assert!((pct - 11.111).abs() < 1e-3);
    }

    #[test]
    fn test_ratio_and_trend() {
        assert!(check(&Relation::Ratio {
            claimed: 6.0,
            numerator: 300.0,
            denominator: 50.0
        })
        .holds());
        assert!(check(&Relation::Trend {
            claimed: 12.5,
            current: 450.0,
            previous: 400.0
        })
        .holds());
        assert!(!check(&Relation::Trend {
            claimed: 20.0,
            current: 450.0,
            previous: 400.0
        })
        .holds());
    }

    #[test]
    fn test_derived_relations_keep_operands() {
        let trend = check(&Relation::Trend {
            claimed: 12.5,
            current: 450.0,
            previous: 400.0,
        });
        assert_eq!(
            trend,
            LinearCheck::Proportion {
                claimed: 125_000,
                base: 4_000_000,
                target: 4_500_000,
                offset: 4_000_000,
                weight: 1_000_000,
                tol: 4_000_000_000,
            }
        );
        let sum = check(&Relation::SumConsistency {
            total: 100.0,
            components: vec![60.0, 40.0],
        });
        assert!(matches!(sum, LinearCheck::Sum { ref parts, .. } if parts.len() == 2));
    }

    #[test]
    fn test_zero_divisors_are_undeterminable() {
        let tol = Tolerances::default();
        for rel in [
            Relation::Average {
                claimed: 1.0,
                total: 10.0,
                count: 0,
            },
            Relation::Percentage {
                claimed: 1.0,
                part: 1.0,
                total: 0.0,
            },
            Relation::Ratio {
                claimed: 1.0,
                numerator: 1.0,
                denominator: 0.0,
            },
            Relation::Trend {
                claimed: 1.0,
                current: 1.0,
                previous: 0.0,
            },
        ] {
            assert!(matches!(rel.encode(&tol), Ok(Encoding::Undeterminable(_))));
            assert_eq!(rel.correction(), None);
        }
    }

    #[test]
    fn test_strict_bounds() {
        assert!(!check(&Relation::GreaterThan {
            actual: 50.0,
            bound: 50.0
        })
        .holds());
        assert!(check(&Relation::LessThan {
            actual: 49.99,
            bound: 50.0
        })
        .holds());
        assert!(!check(&Relation::Range {
            actual: 100.0,
            min: 100.0,
            max: 200.0
        })
        .holds());
    }

    #[test]
    fn test_sum_consistency() {
        let rel = Relation::SumConsistency {
            total: 100.0,
            components: vec![60.0, 40.0],
        };
        assert!(check(&rel).holds());
        let off = Relation::SumConsistency {
            total: 100.0,
            components: vec![60.0, 40.02],
        };
        assert!(!check(&off).holds());
        assert_eq!(off.correction(), None);
    }

    #[test]
    fn test_series_checks() {
        assert!(LinearCheck::NonDecreasing { values: vec![1, 1, 2] }.holds());
        assert!(!LinearCheck::NonDecreasing { values: vec![2, 1] }.holds());
        assert!(LinearCheck::NonDecreasing { values: vec![] }.holds());
        assert!(LinearCheck::AllAtMost {
            values: vec![1, 5],
            bound: 5
        }
        .holds());
    }
}
