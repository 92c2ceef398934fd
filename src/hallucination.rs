//! Hallucinated entity detection.
//!
//! Capitalized names in typical "entity" positions ("Dining: $50",
//! "spent $50 on Dining", "Dining spending", ...) are collected as suspects.
//! A suspect is reported when it is not a stop word, not known, not bound to
//! a nearby claim, and neither spelled nor meant like a known entity.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::HallucinationConfig;
use crate::embedding::EmbeddingService;
use crate::resolution::closest_match;
use crate::types::{BudgetContext, Claim, HallucinationFinding, MentionHint};

const NAME: &str = r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)";

static SUSPECT_PATTERNS: LazyLock<Vec<(Regex, MentionHint)>> = LazyLock::new(|| {
    [
        (format!(r"{NAME}\s*[:=]\s*"), MentionHint::Generic),
        (
            format!(r"spent\s+\$?\d+\s+on\s+{NAME}"),
            MentionHint::MerchantOrCategory,
        ),
        (format!(r"total\s+for\s+{NAME}\s+was"), MentionHint::Generic),
        (format!(r"{NAME}\s+cost\s+\$?"), MentionHint::Generic),
        (format!(r"The\s+{NAME}\s+category"), MentionHint::Category),
        (format!(r"In\s+{NAME},"), MentionHint::Generic),
        (format!(r"{NAME}\s+spending"), MentionHint::Category),
    ]
    .into_iter()
    .map(|(pattern, hint)| {
        (
            Regex::new(&pattern).expect("suspect pattern is valid"),
            hint,
        )
    })
    .collect()
});

/// A capitalized name found in an entity position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspect<'a> {
    /// The name as written.
    pub name: &'a str,
    /// Start of the pattern match.
    pub position: usize,
    /// Which pattern family found it.
    pub hint: MentionHint,
}

/// Collect suspects in pattern order, then text order.
#[must_use]
pub fn collect_suspects(text: &str) -> Vec<Suspect<'_>> {
    let mut suspects = Vec::new();
    for (pattern, hint) in SUSPECT_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            suspects.push(Suspect {
                name: name.as_str(),
                position: whole.start(),
                hint: *hint,
            });
        }
    }
    suspects
}

/// Reports entities the narrative mentions but the ledger does not know.
#[derive(Debug, Clone, Default)]
pub struct HallucinationDetector {
    config: HallucinationConfig,
    embeddings: Option<EmbeddingService>,
}

impl HallucinationDetector {
    /// Create a detector without a semantic stage.
    #[must_use]
    pub fn new(config: HallucinationConfig) -> Self {
        Self {
            config,
            embeddings: None,
        }
    }

    /// Enable the semantic stage.
    #[must_use]
    pub fn with_embeddings(mut self, embeddings: EmbeddingService) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &HallucinationConfig {
        &self.config
    }

    fn is_stop_word(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.config.stop_words.iter().any(|w| *w == lower)
    }

    fn is_bound(&self, suspect: &Suspect<'_>, claims: &[Claim]) -> bool {
        claims.iter().any(|c| {
            c.entity.as_deref() == Some(suspect.name)
                || (c.entity.is_some()
                    && c.span.start.abs_diff(suspect.position) < self.config.bound_proximity)
        })
    }

    /// Scan `text` for hallucinated entities.
    pub async fn detect(
        &self,
        text: &str,
        claims: &[Claim],
        context: &BudgetContext,
    ) -> Vec<HallucinationFinding> {
        let mut seen = HashSet::new();
        let mut findings = Vec::new();

        for suspect in collect_suspects(text) {
            if self.is_stop_word(suspect.name)
                || context.is_known(suspect.name)
                || self.is_bound(&suspect, claims)
            {
                continue;
            }
            if closest_match(
                suspect.name,
                context.known_entities(),
                self.config.fuzzy_cutoff,
            )
            .is_some()
            {
                continue;
            }

            let best_similarity = self.best_similarity(&suspect, context).await;
            if best_similarity.is_some_and(|s| s > self.config.semantic_threshold) {
                continue;
            }
            if !seen.insert((suspect.name, suspect.position)) {
                continue;
            }

            let score = (1.0 - best_similarity.unwrap_or(0.0)).clamp(0.0, 1.0);
            debug!(
                entity = suspect.name,
                hint = suspect.hint.as_str(),
                score,
                "hallucination detected"
            );
            findings.push(HallucinationFinding {
                entity: suspect.name.to_string(),
                position: suspect.position,
                hint: suspect.hint,
                score,
                best_similarity,
            });
        }

        findings
    }

    /// Highest similarity to a category (or, unless the suspect was phrased
    /// as a category, a project). `None` when unknown.
    async fn best_similarity(
        &self,
        suspect: &Suspect<'_>,
        context: &BudgetContext,
    ) -> Option<f32> {
        let embeddings = self.embeddings.as_ref()?;
        let result = if suspect.hint == MentionHint::Category {
            embeddings
                .best_match(suspect.name, context.all_categories.iter().map(String::as_str))
                .await
        } else {
            embeddings
                .best_match(suspect.name, context.semantic_targets())
                .await
        };
        match result {
            Ok(best) => Some(best.map_or(0.0, |m| m.similarity)),
            Err(err) => {
                warn!(
                    entity = suspect.name,
                    error = %err,
                    "semantic hallucination check unavailable"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingCacheConfig, MockEmbeddingProvider};
    use crate::types::{BindingSource, MetricType, Span};
    use std::sync::Arc;

    fn context() -> BudgetContext {
        BudgetContext::new()
            .with_total(450.0)
            .with_category("Dining", 50.0)
            .with_category("Groceries", 120.0)
            .with_project("Renovation", 200.0)
            .with_merchant("Starbucks", 12.0)
    }

    fn detector() -> HallucinationDetector {
        let provider = MockEmbeddingProvider::new(128).with_alias("restaurants", "Dining");
        HallucinationDetector::default().with_embeddings(EmbeddingService::cached(
            provider,
            EmbeddingCacheConfig::default(),
        ))
    }

    #[test]
    fn test_collect_suspects() {
        let suspects = collect_suspects("Netflix spending was high. The Gym category: $40");
        let names: Vec<_> = suspects.iter().map(|s| (s.name, s.hint)).collect();
        assert!(names.contains(&("Netflix", MentionHint::Category)));
        assert!(names.contains(&("Gym", MentionHint::Category)));
    }

    #[tokio::test]
    async fn test_unknown_entity_is_reported() {
        let findings = detector()
            .detect("Netflix spending was high", &[], &context())
            .await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].entity, "Netflix");
        assert_eq!(findings[0].position, 0);
        assert!(findings[0].score > 0.0 && findings[0].score <= 1.0);
        assert!(findings[0].best_similarity.is_some());
    }

    #[tokio::test]
    async fn test_known_stop_fuzzy_and_semantic_are_skipped() {
        let text = "Dining spending was fine. Total: $5. Dinning cost $4. Restaurants spending rose.";
        let findings = detector().detect(text, &[], &context()).await;
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[tokio::test]
    async fn test_bound_suspects_are_skipped() {
        let text = "Netflix cost $15.00";
        let claim = Claim::new("$15.00", 15.0, MetricType::Currency, Span::new(13, 19))
            .with_entity("Netflix", 0.5, BindingSource::FuzzyMatch);
        let findings = detector().detect(text, &[claim], &context()).await;
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_no_embeddings_scores_one() {
        let findings = HallucinationDetector::default()
            .detect("In Narnia, prices were odd.", &[], &context())
            .await;
        assert_eq!(findings.len(), 1);
        assert!((findings[0].score - 1.0).abs() < f32::EPSILON);
        assert_eq!(findings[0].best_similarity, None);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_unknown() {
        let provider = Arc::new(MockEmbeddingProvider::new(16));
        provider.set_failing(true);
        let detector =
            HallucinationDetector::default().with_embeddings(EmbeddingService::new(provider));
        let findings = detector
            .detect("Netflix spending was high", &[], &context())
            .await;
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].best_similarity, None);
    }

    #[tokio::test]
    async fn test_repeated_mentions_reported_per_position() {
        let findings = HallucinationDetector::default()
            .detect("Hulu cost $5 and Hulu spending grew", &[], &context())
            .await;
        let hulu: Vec<_> = findings.iter().filter(|f| f.entity == "Hulu").collect();
        assert_eq!(hulu.len(), 2);
        assert_ne!(hulu[0].position, hulu[1].position);
    }
}
