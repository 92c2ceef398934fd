//! Rewriting corrected values into the narrative.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{MetricType, Span, VerificationStep};

/// A value to write over a claim's span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    /// Where the claim sits.
    pub span: Span,
    /// Decides the formatting.
    pub metric_type: MetricType,
    /// The value to write.
    pub value: f64,
}

impl Correction {
    /// The correction carried by a trace step, if any.
    #[must_use]
    pub fn from_step(step: &VerificationStep) -> Option<Self> {
        step.correction.map(|value| Self {
            span: step.claim.span,
            metric_type: step.claim.metric_type,
            value,
        })
    }

    /// The replacement text.
    #[must_use]
    pub fn render(&self) -> String {
        format_value(self.value, self.metric_type)
    }
}

/// Format a value the way a claim of `metric_type` states it.
#[must_use]
pub fn format_value(value: f64, metric_type: MetricType) -> String {
    match metric_type {
        MetricType::Currency | MetricType::Average | MetricType::Temporal => {
            format!("${}", group_thousands(value))
        }
        MetricType::Percentage => format!("{value:.1}%"),
        #[allow(clippy::cast_possible_truncation)]
        MetricType::Count => format!("{}", value.trunc() as i64),
        _ => format!("{value:?}"),
    }
}

/// `1234567.891` -> `"1,234,567.89"`
fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (sign, digits) = fixed
        .strip_prefix('-')
        .map_or(("", fixed.as_str()), |rest| ("-", rest));
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac_part}")
}

/// Applies corrections from the end of the text backwards, so earlier spans
/// keep their offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorrectionApplier;

impl CorrectionApplier {
    /// Create an applier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Rewrite `text`. Spans that do not fall on character boundaries of
    /// `text` are skipped.
    #[must_use]
    pub fn apply(&self, text: &str, corrections: &[Correction]) -> String {
        let mut ordered: Vec<&Correction> = corrections.iter().collect();
        ordered.sort_by(|a, b| b.span.start.cmp(&a.span.start));

        let mut out = text.to_string();
        for correction in ordered {
            let Span { start, end } = correction.span;
            if start > end || out.get(start..end).is_none() {
                warn!(start, end, "correction span outside text, skipped");
                continue;
            }
            out.replace_range(start..end, &correction.render());
        }
        out
    }
}
