//! Claim extraction: regex pass, inline binding, semantic pass, overlap merge.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::config::ExtractionConfig;
use crate::embedding::EmbeddingService;
use crate::extraction::patterns::{RawMatch, scan};
use crate::extraction::sentences::split_sentences;
use crate::resolution::EntityResolver;
use crate::types::{BindingSource, BudgetContext, Claim, MetricType, Span};

const SNIPPET_CHARS: usize = 50;

/// Turns narrative text into ordered, non-overlapping claims.
#[derive(Debug, Clone, Default)]
pub struct ClaimExtractor {
    config: ExtractionConfig,
    resolver: EntityResolver,
    embeddings: Option<EmbeddingService>,
}

impl ClaimExtractor {
    /// Create an extractor that binds entities with `resolver`.
    #[must_use]
    pub fn new(config: ExtractionConfig, resolver: EntityResolver) -> Self {
        Self {
            config,
            resolver,
            embeddings: None,
        }
    }

    /// Enable the semantic pass.
    #[must_use]
    pub fn with_embeddings(mut self, embeddings: EmbeddingService) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract and bind every claim in `text`.
    ///
    /// Regex claims come first, semantic claims after; the merged list is
    /// sorted by start offset and any claim starting inside the previously
    /// kept one is dropped.
    pub async fn extract(&self, text: &str, context: &BudgetContext) -> Vec<Claim> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let regex_claims = self.extract_regex(text, context).await;
        let neural_claims = self.extract_semantic(text, context, &regex_claims).await;
        debug!(
            regex = regex_claims.len(),
            neural = neural_claims.len(),
            "claims extracted"
        );

        let mut all = regex_claims;
        all.extend(neural_claims);
        merge_claims(all)
    }

    /// Pattern matches, de-overlapped and bound.
    pub async fn extract_regex(&self, text: &str, context: &BudgetContext) -> Vec<Claim> {
        let mut raw = scan(text);
        raw.sort_by_key(|m| m.start);

        let mut kept: Vec<RawMatch> = Vec::with_capacity(raw.len());
        for m in raw {
            if kept.last().is_some_and(|last| m.start < last.end) {
                continue;
            }
            kept.push(m);
        }

        let mut claims = Vec::with_capacity(kept.len());
        for m in kept {
            let span = Span::new(m.start, m.end);
            let (binding, metric_type) = self
                .resolver
                .resolve(text, span, m.metric_type, context)
                .await;

            let mut claim = Claim::new(m.text, m.value, metric_type, span);
            claim.secondary_value = m.secondary_value;
            if let Some(entity) = binding.entity {
                claim = claim.with_entity(entity, binding.confidence, binding.source);
            }
            claims.push(claim);
        }
        claims
    }

    /// Implicit mentions of known categories and projects.
    ///
    /// Sentences that already hold a bound claim are skipped, as are
    /// entities some claim is already bound to.
    pub async fn extract_semantic(
        &self,
        text: &str,
        context: &BudgetContext,
        existing: &[Claim],
    ) -> Vec<Claim> {
        let Some(embeddings) = self.embeddings.as_ref() else {
            return Vec::new();
        };
        if !self.config.enable_semantic_pass {
            return Vec::new();
        }

        let mut claimed: BTreeSet<String> =
            existing.iter().filter_map(|c| c.entity.clone()).collect();
        let mut out = Vec::new();

        for sentence in split_sentences(text) {
            if sentence.text.chars().count() < self.config.min_sentence_len {
                continue;
            }
            let covered = existing.iter().any(|c| {
                c.entity.is_some()
                    && c.span.start >= sentence.start
                    && c.span.start < sentence.end()
            });
            if covered {
                continue;
            }

            let targets = context
                .semantic_targets()
                .filter(|name| !claimed.contains(*name));
            let best = match embeddings.best_match(sentence.text, targets).await {
                Ok(best) => best,
                Err(err) => {
                    warn!(error = %err, "semantic claim scan skipped a sentence");
                    continue;
                }
            };

            let Some(best) = best else { continue };
            if best.similarity <= self.config.semantic_threshold {
                continue;
            }

            let snippet: String = sentence.text.chars().take(SNIPPET_CHARS).collect();
            let snippet = if snippet.len() < sentence.text.len() {
                format!("{snippet}...")
            } else {
                snippet
            };

            out.push(
                Claim::new(
                    snippet,
                    0.0,
                    MetricType::SemanticInference,
                    Span::new(sentence.start, sentence.end()),
                )
                .with_entity(best.name, best.similarity, BindingSource::NeuralExtraction),
            );
            claimed.insert(best.name.to_string());
        }

        out
    }
}

/// Sort by start offset and drop any claim that starts before the end of
/// the last kept claim. Ties keep the earlier-listed claim.
#[must_use]
pub fn merge_claims(mut claims: Vec<Claim>) -> Vec<Claim> {
    claims.sort_by_key(|c| c.span.start);
    let mut unique: Vec<Claim> = Vec::with_capacity(claims.len());
    for claim in claims {
        if unique
            .last()
            .is_some_and(|last| claim.span.start < last.span.end)
        {
            continue;
        }
        unique.push(claim);
    }
    unique
}
