//! Plain-text rendering of a verification trace.

use std::fmt::Write;

use crate::correction::format_value;
use crate::types::{ConsistencyStatus, StepStatus, TraceEntry, VerificationResult};

/// Render `result` as a report. `text` is the narrative that was verified;
/// the corrected text is shown only when it differs.
#[must_use]
pub fn explain(text: &str, result: &VerificationResult) -> String {
    let mut out = String::new();
    let verdict = if result.is_valid { "PASSED" } else { "FAILED" };
    let _ = writeln!(
        out,
        "Verification {verdict} (score {:.2}, {} ms)",
        result.score, result.latency_ms
    );

    let steps: Vec<_> = result.steps().collect();
    if !steps.is_empty() {
        out.push_str("\nClaims:\n");
    }
    for step in steps {
        let claim = &step.claim;
        let _ = write!(
            out,
            "  [{}] \"{}\" ({})",
            step.status.as_str(),
            claim.original_text,
            claim.metric_type
        );
        if let Some(entity) = &claim.entity {
            let _ = write!(out, " -> {entity} via {}", claim.binding_source);
        }
        if step.status == StepStatus::Corrected
            && let Some(value) = step.correction
        {
            let _ = write!(out, "; actual {}", format_value(value, claim.metric_type));
        }
        if let Some(interval) = claim.uncertainty_interval {
            let _ = write!(out, "; interval {interval}");
        }
        if let Some(method) = step.method {
            let _ = write!(out, " [{method}]");
        }
        if let Some(detail) = &step.detail {
            let _ = write!(out, " ({detail})");
        }
        out.push('\n');
    }

    let findings: Vec<_> = result.hallucinations().collect();
    if !findings.is_empty() {
        out.push_str("\nUnknown entities:\n");
        for finding in findings {
            let _ = writeln!(
                out,
                "  \"{}\" at {} ({}, score {:.2})",
                finding.entity,
                finding.position,
                finding.hint.as_str(),
                finding.score
            );
        }
    }

    if let Some(check) = result.sum_consistency() {
        let status = match check.status {
            ConsistencyStatus::Verified => "verified",
            ConsistencyStatus::Failed => "failed",
        };
        let _ = writeln!(
            out,
            "\nSum consistency: {status} (total {:.2}, {} components sum to {:.2}) [{}]",
            check.total, check.component_count, check.components_sum, check.method
        );
    }

    if result
        .trace
        .iter()
        .any(|entry| matches!(entry, TraceEntry::NoClaimsFound))
    {
        out.push_str("\nNo numeric claims found.\n");
    }

    if result.corrected_text != text {
        let _ = write!(out, "\nCorrected text:\n  {}\n", result.corrected_text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BindingSource, Claim, HallucinationFinding, MentionHint, MetricType, ProofMethod, Span,
        SumConsistency, VerificationMetrics, VerificationStep,
    };

    fn result() -> VerificationResult {
        let mut verified = VerificationStep::pending(
            Claim::new("$50.00", 50.0, MetricType::Currency, Span::new(10, 16)).with_entity(
                "Dining",
                1.0,
                BindingSource::ExactMatch,
            ),
        );
        verified.status = StepStatus::Verified;
        verified.method = Some(ProofMethod::Fallback);

        let mut corrected = VerificationStep::pending(
            Claim::new("$500.00", 500.0, MetricType::Currency, Span::new(37, 44)).with_entity(
                "Total",
                1.0,
                BindingSource::KeywordProximity,
            ),
        );
        corrected.status = StepStatus::Corrected;
        corrected.correction = Some(450.0);
        corrected.method = Some(ProofMethod::Fallback);

        VerificationResult {
            is_valid: false,
            score: 0.5,
            corrected_text: "You spent $50.00 on Dining, a total of $450.00.".into(),
            trace: vec![
                TraceEntry::ClaimCheck(verified),
                TraceEntry::ClaimCheck(corrected),
                TraceEntry::HallucinationDetected(HallucinationFinding {
                    entity: "Netflix".into(),
                    position: 0,
                    hint: MentionHint::Category,
                    score: 1.0,
                    best_similarity: None,
                }),
                TraceEntry::SumConsistency(SumConsistency {
                    total: 500.0,
                    components_sum: 50.0,
                    component_count: 1,
                    status: ConsistencyStatus::Failed,
                    method: ProofMethod::Fallback,
                }),
            ],
            latency_ms: 2,
            metrics: VerificationMetrics::default(),
        }
    }

    #[test]
    fn test_report_sections() {
        let report = explain("You spent $50.00 on Dining, a total of $500.00.", &result());
        assert!(report.starts_with("Verification FAILED (score 0.50, 2 ms)"));
        assert!(report.contains(
            "  [verified] \"$50.00\" (currency) -> Dining via exact_match [fallback]"
        ));
        assert!(report.contains("-> Total via keyword_proximity; actual $450.00 [fallback]"));
        assert!(report.contains("  \"Netflix\" at 0 (category, score 1.00)"));
        assert!(report.contains("Sum consistency: failed (total 500.00, 1 components sum"));
        assert!(report.contains("Corrected text:\n  You spent $50.00 on Dining, a total of $450.00"));
    }

    #[test]
    fn test_unchanged_text_is_not_repeated() {
        let result = VerificationResult {
            is_valid: true,
            score: 1.0,
            corrected_text: "Nothing to see.".into(),
            trace: vec![TraceEntry::NoClaimsFound],
            latency_ms: 0,
            metrics: VerificationMetrics::default(),
        };
        let report = explain("Nothing to see.", &result);
        assert!(report.contains("No numeric claims found."));
        assert!(!report.contains("Corrected text"));
    }
}
