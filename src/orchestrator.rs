//! End-to-end verification of one narrative.
//!
//! [`VerificationOrchestrator::verify_response`] extracts claims, nudges
//! their confidence by context plausibility, proves each against the
//! [`BudgetContext`], scans for unknown entities, checks that components add
//! up to the stated total, and rewrites wrong numbers.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::config::VerifierConfig;
use crate::correction::{Correction, CorrectionApplier};
use crate::embedding::{EmbeddingProvider, EmbeddingService};
use crate::error::OxiVerifyError;
use crate::extraction::ClaimExtractor;
use crate::hallucination::HallucinationDetector;
use crate::reasoner::HybridReasoner;
use crate::resolution::EntityResolver;
use crate::solver::{ConstraintSolver, ProofEngine, Tolerances};
use crate::text::window_around;
use crate::types::{
    BindingSource, BudgetContext, Claim, ConfidenceAdjustment, HallucinationFinding, Plausibility,
    StepStatus, TraceEntry, VerificationMetrics, VerificationResult, VerificationStep,
};
use crate::verifier::{ConstraintVerifier, Verdict};

/// Verifies LLM-written financial narratives against ground-truth figures.
pub struct VerificationOrchestrator {
    config: VerifierConfig,
    extractor: ClaimExtractor,
    verifier: ConstraintVerifier,
    detector: HallucinationDetector,
    applier: CorrectionApplier,
    embeddings: Option<EmbeddingService>,
    reasoner: Option<Arc<HybridReasoner>>,
}

impl std::fmt::Debug for VerificationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationOrchestrator")
            .field("solver", &self.verifier.engine().solver_name())
            .field("embeddings", &self.embeddings.is_some())
            .field("reasoner", &self.reasoner.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for VerificationOrchestrator {
    fn default() -> Self {
        Self::new(VerifierConfig::default(), None, None, None)
    }
}

impl VerificationOrchestrator {
    fn new(
        config: VerifierConfig,
        embeddings: Option<EmbeddingService>,
        solver: Option<Arc<dyn ConstraintSolver>>,
        reasoner: Option<Arc<HybridReasoner>>,
    ) -> Self {
        let mut resolver = EntityResolver::new(config.resolution.clone());
        let mut extractor_embeddings = None;
        let mut detector = HallucinationDetector::new(config.hallucination.clone());
        if let Some(embeddings) = &embeddings {
            resolver = resolver.with_embeddings(embeddings.clone());
            extractor_embeddings = Some(embeddings.clone());
            detector = detector.with_embeddings(embeddings.clone());
        }
        let mut extractor = ClaimExtractor::new(config.extraction.clone(), resolver);
        if let Some(embeddings) = extractor_embeddings {
            extractor = extractor.with_embeddings(embeddings);
        }

        let engine = match solver {
            Some(solver) => ProofEngine::new(solver, config.solver.timeout_ms),
            None => ProofEngine::from_config(&config.solver),
        };
        let verifier = ConstraintVerifier::new(engine, Tolerances::from(&config.solver));

        Self {
            config,
            extractor,
            verifier,
            detector,
            applier: CorrectionApplier::new(),
            embeddings,
            reasoner,
        }
    }

    /// Start a builder.
    #[must_use]
    pub fn builder() -> VerificationOrchestratorBuilder {
        VerificationOrchestratorBuilder::new()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The claim extractor.
    #[must_use]
    pub fn extractor(&self) -> &ClaimExtractor {
        &self.extractor
    }

    /// The constraint verifier.
    #[must_use]
    pub fn verifier(&self) -> &ConstraintVerifier {
        &self.verifier
    }

    /// The shared embedding service, if any.
    #[must_use]
    pub fn embeddings(&self) -> Option<&EmbeddingService> {
        self.embeddings.as_ref()
    }

    /// Verify `text` against `context`.
    ///
    /// Never fails: solver trouble degrades to arithmetic and collaborator
    /// trouble degrades to unknown signals.
    pub async fn verify_response(&self, text: &str, context: &BudgetContext) -> VerificationResult {
        let start = Instant::now();
        let mut claims = self.extractor.extract(text, context).await;

        if claims.is_empty() {
            let findings = self.detector.detect(text, &claims, context).await;
            if findings.is_empty() {
                info!(reason = "no_claims", "verification skipped");
                return VerificationResult {
                    is_valid: true,
                    score: 1.0,
                    corrected_text: text.to_string(),
                    trace: vec![TraceEntry::NoClaimsFound],
                    latency_ms: elapsed_ms(start),
                    metrics: VerificationMetrics::default(),
                };
            }
            debug!(
                hallucinations = findings.len(),
                "no claims, unknown entities found"
            );
            let metrics = VerificationMetrics {
                hallucination_avg_conf: mean_score(&findings),
                hallucinations: findings.len(),
                ..VerificationMetrics::default()
            };
            let mut trace = vec![TraceEntry::NoClaimsFound];
            trace.extend(findings.into_iter().map(TraceEntry::HallucinationDetected));
            return self.finish(start, false, 0.5, text.to_string(), trace, metrics);
        }

        let mut trace = Vec::with_capacity(claims.len() + 2);
        let mut corrections = Vec::new();
        let mut accumulated = 0.0f32;
        let mut failed_checks = 0usize;

        for claim in &mut claims {
            let plausibility = self.plausibility(text, claim).await;
            let adjustment = plausibility.and_then(|p| self.nudge(claim, p));

            let verdict = self.verifier.verify_claim(claim, text, context).await;
            let status = verdict.status();
            accumulated += contribution(&verdict, claim);
            if status == StepStatus::Unverified {
                failed_checks += 1;
            }

            let mut step = VerificationStep::pending(claim.clone());
            step.status = status;
            step.correction = verdict.correction();
            step.plausibility = plausibility;
            step.adjustment = adjustment;
            step.method = verdict.method();
            step.detail = verdict.detail().map(str::to_string);
            debug!(
                claim = %step.claim.original_text,
                status = status.as_str(),
                "claim checked"
            );
            if let Some(correction) = Correction::from_step(&step) {
                corrections.push(correction);
            }
            trace.push(TraceEntry::ClaimCheck(step));
        }

        let findings = self.detector.detect(text, &claims, context).await;
        let hallucination_avg_conf = mean_score(&findings);
        let hallucinations = findings.len();
        trace.extend(findings.into_iter().map(TraceEntry::HallucinationDetected));

        if let Some(check) = self.verifier.verify_sum_consistency(&claims).await {
            trace.push(TraceEntry::SumConsistency(check));
        }

        let corrected_text = self.applier.apply(text, &corrections);

        #[allow(clippy::cast_precision_loss)]
        let mut score = accumulated / claims.len() as f32;
        if hallucinations > 0 {
            score *= 0.5;
        }
        let is_valid = corrections.is_empty() && hallucinations == 0;

        let metrics = VerificationMetrics {
            coverage_ratio: coverage_ratio(text, &claims),
            neural_claims_recovered: claims
                .iter()
                .filter(|c| c.binding_source == BindingSource::NeuralExtraction)
                .count(),
            hallucination_avg_conf,
            claim_count: claims.len(),
            corrections: corrections.len(),
            hallucinations,
            failed_checks,
        };

        self.finish(start, is_valid, score, corrected_text, trace, metrics)
    }

    fn finish(
        &self,
        start: Instant,
        is_valid: bool,
        score: f32,
        corrected_text: String,
        trace: Vec<TraceEntry>,
        metrics: VerificationMetrics,
    ) -> VerificationResult {
        let latency_ms = elapsed_ms(start);
        info!(
            is_valid,
            score,
            latency_ms,
            coverage_ratio = metrics.coverage_ratio,
            neural_claims_recovered = metrics.neural_claims_recovered,
            hallucination_avg_conf = metrics.hallucination_avg_conf,
            claim_count = metrics.claim_count,
            corrections = metrics.corrections,
            hallucinations = metrics.hallucinations,
            failed_checks = metrics.failed_checks,
            solver = self.verifier.engine().solver_name().unwrap_or("none"),
            "verification complete"
        );
        VerificationResult {
            is_valid,
            score,
            corrected_text,
            trace,
            latency_ms,
            metrics,
        }
    }

    /// Plausibility of a bound claim's entity in its context window. The
    /// reasoner is preferred over the bare embedding service.
    async fn plausibility(&self, text: &str, claim: &Claim) -> Option<Plausibility> {
        if !self.config.plausibility.enabled {
            return None;
        }
        let entity = claim.entity.as_deref()?;
        let window = window_around(text, claim.span, self.config.plausibility.window);
        if let Some(reasoner) = &self.reasoner {
            return Some(reasoner.validate_claim_plausibility(entity, window).await);
        }
        let embeddings = self.embeddings.as_ref()?;
        Some(embeddings.plausibility(entity, window).await)
    }

    fn nudge(&self, claim: &mut Claim, plausibility: Plausibility) -> Option<ConfidenceAdjustment> {
        let score = plausibility.score()?;
        let settings = &self.config.plausibility;
        if score < settings.low {
            claim.confidence *= settings.penalty_factor;
            Some(ConfidenceAdjustment::Penalized)
        } else if score > settings.high {
            claim.confidence = (claim.confidence * settings.boost_factor).min(1.0);
            Some(ConfidenceAdjustment::Boosted)
        } else {
            None
        }
    }
}

/// Score contribution of one claim. Relations that could not be formed and
/// claims with no entity pass unpenalized.
fn contribution(verdict: &Verdict, claim: &Claim) -> f32 {
    match verdict {
        Verdict::Holds(_) if claim.entity.is_some() => claim.confidence,
        Verdict::Holds(_) | Verdict::Unchecked(_) => 1.0,
        Verdict::Violated {
            correction: Some(_),
            ..
        } => 1.0,
        Verdict::Violated { .. } | Verdict::Unverifiable(_) => 0.0,
    }
}

fn coverage_ratio(text: &str, claims: &[Claim]) -> f32 {
    if text.is_empty() {
        return 0.0;
    }
    let covered: usize = claims.iter().map(|c| c.span.len()).sum();
    #[allow(clippy::cast_precision_loss)]
    let ratio = covered as f32 / text.len() as f32;
    ratio.min(1.0)
}

fn mean_score(findings: &[HallucinationFinding]) -> f32 {
    if findings.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = findings.len() as f32;
    findings.iter().map(|f| f.score).sum::<f32>() / n
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Builder for [`VerificationOrchestrator`].
#[derive(Default)]
pub struct VerificationOrchestratorBuilder {
    config: Option<VerifierConfig>,
    embeddings: Option<EmbeddingService>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    solver: Option<Arc<dyn ConstraintSolver>>,
    reasoner: Option<Arc<HybridReasoner>>,
}

impl VerificationOrchestratorBuilder {
    /// Create a new builder.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: VerifierConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an embedding service with every component that can use one.
    #[must_use]
    pub fn with_embeddings(mut self, embeddings: EmbeddingService) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Embed with `provider`, cached as `VerifierConfig::cache` says.
    /// Ignored when [`with_embeddings`](Self::with_embeddings) is also set.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `solver` instead of the configured backend.
    #[must_use]
    pub fn with_solver(mut self, solver: Arc<dyn ConstraintSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Consult `reasoner` for context plausibility.
    #[must_use]
    pub fn with_reasoner(mut self, reasoner: Arc<HybridReasoner>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`OxiVerifyError::Config`] when the configuration is invalid.
    pub fn build(self) -> Result<VerificationOrchestrator, OxiVerifyError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embeddings = self.embeddings.or_else(|| {
            self.provider
                .map(|provider| EmbeddingService::cached(provider, config.cache.clone()))
        });
        Ok(VerificationOrchestrator::new(
            config,
            embeddings,
            self.solver,
            self.reasoner,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlausibilityConfig;
    use crate::embedding::MockEmbeddingProvider;
    use crate::solver::{MockSolver, SolverMode};
    use crate::types::{ConsistencyStatus, MetricType, ProofMethod};

    fn scenario_context() -> BudgetContext {
        BudgetContext::new()
            .with_total(450.0)
            .with_category("Dining", 50.0)
    }

    fn orchestrator() -> VerificationOrchestrator {
        VerificationOrchestrator::builder().build().unwrap()
    }

    #[tokio::test]
    async fn test_dining_verified_total_corrected() {
        let text = "You spent $50.00 on Dining, a total of $500.00.";
        let result = orchestrator().verify_response(text, &scenario_context()).await;

        assert!(!result.is_valid);
        let steps: Vec<_> = result.steps().collect();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].inferred_entity(), Some("Dining"));
        assert_eq!(steps[0].status, StepStatus::Verified);
        assert_eq!(steps[1].inferred_entity(), Some("Total"));
        assert_eq!(steps[1].status, StepStatus::Corrected);
        assert_eq!(steps[1].correction, Some(450.0));
        assert_eq!(
            result.corrected_text,
            "You spent $50.00 on Dining, a total of $450.00."
        );
        assert_eq!(result.metrics.corrections, 1);
        assert_eq!(result.metrics.claim_count, 2);
        assert!((result.score - 1.0).abs() < 1e-6);

        let sum = result.sum_consistency().unwrap();
        assert_eq!(sum.status, ConsistencyStatus::Failed);
        assert_eq!(sum.component_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_entity_without_claims_halves_score() {
        let text = "Netflix spending was high";
        let result = orchestrator().verify_response(text, &scenario_context()).await;

        assert!(!result.is_valid);
        assert!((result.score - 0.5).abs() < 1e-6);
        let findings: Vec<_> = result.hallucinations().collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].entity, "Netflix");
        assert_eq!(result.trace[0], TraceEntry::NoClaimsFound);
    }

    #[tokio::test]
    async fn test_unknown_entity_next_to_claim() {
        let text = "Netflix spending was high this month. You spent $50.00 on Dining.";
        let result = orchestrator().verify_response(text, &scenario_context()).await;

        assert_eq!(result.metrics.hallucinations, 1);
        assert!(!result.is_valid);
        assert!((result.score - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_no_claims_short_circuit() {
        let result = orchestrator()
            .verify_response("everything looks fine.", &scenario_context())
            .await;
        assert!(result.is_valid);
        assert!((result.score - 1.0).abs() < f32::EPSILON);
        assert_eq!(result.trace, vec![TraceEntry::NoClaimsFound]);
        assert_eq!(result.corrected_text, "everything looks fine.");
    }

    #[tokio::test]
    async fn test_corrected_text_verifies_clean() {
        let context = scenario_context();
        let orchestrator = orchestrator();
        let first = orchestrator
            .verify_response("You spent $50.00 on Dining, a total of $500.00.", &context)
            .await;
        let second = orchestrator
            .verify_response(&first.corrected_text, &context)
            .await;

        assert_eq!(second.metrics.corrections, 0);
        assert_eq!(second.corrected_text, first.corrected_text);
        assert!(second.steps().all(|s| s.status == StepStatus::Verified));
    }

    #[tokio::test]
    async fn test_solver_failure_degrades_to_fallback() {
        let orchestrator = VerificationOrchestrator::builder()
            .with_solver(Arc::new(MockSolver::new(SolverMode::Fail)))
            .build()
            .unwrap();
        let result = orchestrator
            .verify_response(
                "You spent $50.00 on Dining, a total of $500.00.",
                &scenario_context(),
            )
            .await;

        let steps: Vec<_> = result.steps().collect();
        assert_eq!(steps[1].status, StepStatus::Corrected);
        assert!(
            steps
                .iter()
                .all(|s| s.method == Some(ProofMethod::Fallback) && s.detail.is_some())
        );
    }

    #[tokio::test]
    async fn test_unbound_claim_is_not_penalized() {
        let result = orchestrator()
            .verify_response("Someone paid $12.00 yesterday.", &scenario_context())
            .await;
        let step = result.steps().next().unwrap();
        assert_eq!(step.claim.metric_type, MetricType::Currency);
        assert_eq!(step.inferred_entity(), None);
        assert_eq!(step.status, StepStatus::Verified);
        assert!((result.score - 1.0).abs() < 1e-6);
        assert!(result.is_valid);
    }

    #[tokio::test]
    async fn test_plausibility_is_annotated_with_embeddings() {
        let orchestrator = VerificationOrchestrator::builder()
            .with_embeddings(EmbeddingService::uncached(MockEmbeddingProvider::new(64)))
            .build()
            .unwrap();
        let result = orchestrator
            .verify_response("You spent $50.00 on Dining.", &scenario_context())
            .await;
        let step = result.steps().next().unwrap();
        assert!(matches!(step.plausibility, Some(Plausibility::Score(_))));
    }

    #[tokio::test]
    async fn test_plausibility_disabled() {
        let config = VerifierConfig::default().with_plausibility(PlausibilityConfig {
            enabled: false,
            ..PlausibilityConfig::default()
        });
        let orchestrator = VerificationOrchestrator::builder()
            .with_config(config)
            .with_embeddings(EmbeddingService::uncached(MockEmbeddingProvider::new(64)))
            .build()
            .unwrap();
        let result = orchestrator
            .verify_response("You spent $50.00 on Dining.", &scenario_context())
            .await;
        assert!(result.steps().all(|s| s.plausibility.is_none()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = VerifierConfig::default();
        config.solver.timeout_ms = 0;
        assert!(
            VerificationOrchestrator::builder()
                .with_config(config)
                .build()
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_provider_is_cached_per_config() {
        let config = VerifierConfig::default()
            .with_cache(crate::embedding::EmbeddingCacheConfig::new(1));
        let orchestrator = VerificationOrchestrator::builder()
            .with_config(config)
            .with_provider(Arc::new(MockEmbeddingProvider::new(16)))
            .build()
            .unwrap();
        let embeddings = orchestrator.embeddings().unwrap();
        embeddings.encode("Dining").await.unwrap();
        embeddings.encode("Travel").await.unwrap();

        let stats = embeddings.cache_stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_nudge_bounds() {
        let orchestrator = orchestrator();
        let mut claim = Claim::new("$1", 1.0, MetricType::Currency, crate::types::Span::new(0, 2))
            .with_entity("Dining", 0.95, BindingSource::ExactMatch);
        assert_eq!(
            orchestrator.nudge(&mut claim, Plausibility::Score(0.9)),
            Some(ConfidenceAdjustment::Boosted)
        );
        assert!((claim.confidence - 1.0).abs() < f32::EPSILON);
        assert_eq!(
            orchestrator.nudge(&mut claim, Plausibility::Score(0.1)),
            Some(ConfidenceAdjustment::Penalized)
        );
        assert!((claim.confidence - 0.8).abs() < 1e-6);
        assert_eq!(orchestrator.nudge(&mut claim, Plausibility::Unknown), None);
        assert_eq!(orchestrator.nudge(&mut claim, Plausibility::Score(0.5)), None);
    }
}
